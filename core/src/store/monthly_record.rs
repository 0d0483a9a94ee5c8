use super::{to_index, PanelStore};
use crate::{
    assemble::MonthlyRecord,
    error::PanelResult,
    primary::PrimarySlot,
    secondary::SecondarySlot,
    sink::RecordSink,
};
use rusqlite::{params, Row};
use std::collections::BTreeSet;

impl PanelStore {
    // ── Monthly records ───────────────────────────────────────────

    pub fn monthly_records(&self, run_id: &str) -> PanelResult<Vec<MonthlyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_id, year, month, calendar_days,
                    primary_label, primary_days, primary_register, primary_points,
                    secondary_1_label, secondary_1_days, secondary_1_points,
                    secondary_2_label, secondary_2_days, secondary_2_points,
                    overlap_a_days, overlap_b_days, overlap_b_points
             FROM monthly_record WHERE run_id = ?1
             ORDER BY batch_index ASC, seq ASC",
        )?;
        let rows = stmt.query_map(params![run_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn record_count(&self, run_id: &str) -> PanelResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM monthly_record WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MonthlyRecord> {
    let primary = match row.get::<_, Option<String>>(4)? {
        Some(label) => Some(PrimarySlot {
            label,
            days:     row.get(5)?,
            register: row.get(6)?,
            points:   row.get(7)?,
        }),
        None => None,
    };
    Ok(MonthlyRecord {
        subject_id:       row.get(0)?,
        year:             row.get(1)?,
        month:            row.get(2)?,
        calendar_days:    row.get(3)?,
        primary,
        secondary_1:      secondary_from_row(row, 8, 1)?,
        secondary_2:      secondary_from_row(row, 11, 2)?,
        overlap_a_days:   row.get(14)?,
        overlap_b_days:   row.get(15)?,
        overlap_b_points: row.get(16)?,
    })
}

fn secondary_from_row(row: &Row<'_>, first: usize, rank: u8) -> rusqlite::Result<Option<SecondarySlot>> {
    match row.get::<_, Option<String>>(first)? {
        Some(label) => Ok(Some(SecondarySlot {
            label,
            days:   row.get(first + 1)?,
            points: row.get(first + 2)?,
            rank,
        })),
        None => Ok(None),
    }
}

impl RecordSink for PanelStore {
    fn completed_batches(&self, run_id: &str) -> PanelResult<BTreeSet<usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT batch_index FROM batch_log WHERE run_id = ?1")?;
        let indexes = stmt
            .query_map(params![run_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        indexes.into_iter().map(to_index).collect()
    }

    /// Batch log entry and records commit together.
    fn write_batch(
        &mut self,
        run_id: &str,
        batch_index: usize,
        records: &[MonthlyRecord],
    ) -> PanelResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO batch_log (run_id, batch_index, record_count) VALUES (?1, ?2, ?3)",
            params![run_id, batch_index as i64, records.len() as i64],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO monthly_record (
                    run_id, batch_index, seq, subject_id, year, month, calendar_days,
                    primary_label, primary_days, primary_register, primary_points,
                    secondary_1_label, secondary_1_days, secondary_1_points,
                    secondary_2_label, secondary_2_days, secondary_2_points,
                    overlap_a_days, overlap_b_days, overlap_b_points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18, ?19, ?20)",
            )?;
            for (seq, r) in records.iter().enumerate() {
                let p = r.primary.as_ref();
                let s1 = r.secondary_1.as_ref();
                let s2 = r.secondary_2.as_ref();
                stmt.execute(params![
                    run_id,
                    batch_index as i64,
                    seq as i64,
                    r.subject_id,
                    r.year,
                    r.month,
                    r.calendar_days,
                    p.map(|s| s.label.as_str()),
                    p.map(|s| s.days),
                    p.map(|s| s.register),
                    p.map(|s| s.points),
                    s1.map(|s| s.label.as_str()),
                    s1.map(|s| s.days),
                    s1.map(|s| s.points),
                    s2.map(|s| s.label.as_str()),
                    s2.map(|s| s.days),
                    s2.map(|s| s.points),
                    r.overlap_a_days,
                    r.overlap_b_days,
                    r.overlap_b_points,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
