//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine reads episodes and writes batches through the
//! `EpisodeSource` and `RecordSink` traits; it never executes SQL.

use crate::error::{PanelError, PanelResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

mod episode;
mod monthly_record;

pub struct PanelStore {
    conn: Connection,
}

impl PanelStore {
    /// Open (or create) the panel database at `path`.
    pub fn open(path: &str) -> PanelResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PanelResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PanelResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, reporting_year: i32, version: &str) -> PanelResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run (run_id, reporting_year, version, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, reporting_year, version, started_at],
        )?;
        Ok(())
    }

    /// Reporting year of an existing run.
    pub fn run_year(&self, run_id: &str) -> PanelResult<Option<i32>> {
        let year = self
            .conn
            .query_row(
                "SELECT reporting_year FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(year)
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date inside a row mapper.
fn parse_date(column: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn to_index(value: i64) -> PanelResult<usize> {
    usize::try_from(value).map_err(|e| PanelError::Other(anyhow::anyhow!("bad batch index {value}: {e}")))
}
