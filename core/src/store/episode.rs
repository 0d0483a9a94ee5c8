use super::{format_date, parse_date, PanelStore};
use crate::{
    episode::{group_by_subject, Episode, EpisodeAttributes, EpisodeSource, SubjectEpisodes},
    error::PanelResult,
};
use rusqlite::params;

impl PanelStore {
    // ── Episode ───────────────────────────────────────────────────

    /// Replace the episodes of `reporting_year` in one transaction.
    /// Importing the same file twice leaves the table unchanged.
    pub fn replace_episodes(&self, reporting_year: i32, episodes: &[Episode]) -> PanelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM episode WHERE reporting_year = ?1",
            params![reporting_year],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO episode (reporting_year, subject_id, start_date, end_date,
                                      activity_type, activity_subtype, insurance_branch,
                                      pension_receipt, special_leave, register_value, point_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for ep in episodes {
                let a = &ep.attributes;
                stmt.execute(params![
                    reporting_year,
                    ep.subject_id,
                    format_date(ep.start_date),
                    format_date(ep.end_date),
                    a.activity_type,
                    a.activity_subtype.map(String::from),
                    a.insurance_branch,
                    a.pension_receipt,
                    a.special_leave,
                    ep.register_value,
                    ep.point_value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn episode_count(&self, reporting_year: i32) -> PanelResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM episode WHERE reporting_year = ?1",
            params![reporting_year],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn episodes_for_year(&self, reporting_year: i32) -> PanelResult<Vec<Episode>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_id, start_date, end_date, activity_type, activity_subtype,
                    insurance_branch, pension_receipt, special_leave, register_value, point_value
             FROM episode WHERE reporting_year = ?1
             ORDER BY subject_id ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![reporting_year], |row| {
            let start: String = row.get(1)?;
            let end: String = row.get(2)?;
            let subtype: Option<String> = row.get(4)?;
            Ok(Episode {
                subject_id: row.get(0)?,
                start_date: parse_date(1, &start)?,
                end_date:   parse_date(2, &end)?,
                attributes: EpisodeAttributes {
                    activity_type:    row.get(3)?,
                    activity_subtype: subtype.and_then(|s| s.chars().next()),
                    insurance_branch: row.get(5)?,
                    pension_receipt:  row.get(6)?,
                    special_leave:    row.get(7)?,
                },
                register_value: row.get(8)?,
                point_value:    row.get(9)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl EpisodeSource for PanelStore {
    fn load_subjects(&self, reporting_year: i32) -> PanelResult<Vec<SubjectEpisodes>> {
        Ok(group_by_subject(self.episodes_for_year(reporting_year)?))
    }
}
