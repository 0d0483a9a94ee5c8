//! Episodes, the raw date-stamped status spells of a subject, and the
//! source trait the engine reads them through.

use crate::{
    apportion::inclusive_days,
    error::{PanelError, PanelResult},
    types::SubjectId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded attribute codes of an episode. Predicates test these only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeAttributes {
    pub activity_type:    u16,
    #[serde(default)]
    pub activity_subtype: Option<char>,
    #[serde(default)]
    pub insurance_branch: Option<u8>,
    #[serde(default)]
    pub pension_receipt:  Option<u8>,
    /// Present when the special leave condition applies.
    #[serde(default)]
    pub special_leave:    Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub subject_id:     SubjectId,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
    #[serde(flatten)]
    pub attributes:     EpisodeAttributes,
    pub register_value: f64,
    pub point_value:    f64,
}

impl Episode {
    /// Inclusive day length. Fails for reversed intervals.
    pub fn length_days(&self) -> PanelResult<u32> {
        inclusive_days(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> PanelResult<()> {
        if self.end_date < self.start_date {
            return Err(PanelError::InvalidInterval {
                start: self.start_date,
                end:   self.end_date,
            });
        }
        Ok(())
    }

    pub fn daily_register(&self) -> PanelResult<f64> {
        Ok(self.register_value / f64::from(self.length_days()?))
    }

    pub fn daily_points(&self) -> PanelResult<f64> {
        Ok(self.point_value / f64::from(self.length_days()?))
    }
}

/// All episodes of one subject, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectEpisodes {
    pub subject_id: SubjectId,
    pub episodes:   Vec<Episode>,
}

impl SubjectEpisodes {
    pub fn first_start(&self) -> Option<NaiveDate> {
        self.episodes.iter().map(|e| e.start_date).min()
    }
}

/// Group flat episodes by subject. Subjects come out ordered by id; each
/// subject keeps its episodes in input order.
pub fn group_by_subject(episodes: impl IntoIterator<Item = Episode>) -> Vec<SubjectEpisodes> {
    let mut groups: BTreeMap<SubjectId, Vec<Episode>> = BTreeMap::new();
    for ep in episodes {
        groups.entry(ep.subject_id.clone()).or_default().push(ep);
    }
    groups
        .into_iter()
        .map(|(subject_id, episodes)| SubjectEpisodes { subject_id, episodes })
        .collect()
}

/// Anything that can hand the engine a reporting year's episodes,
/// already decoded and grouped by subject.
pub trait EpisodeSource {
    fn load_subjects(&self, reporting_year: i32) -> PanelResult<Vec<SubjectEpisodes>>;
}

impl EpisodeSource for Vec<SubjectEpisodes> {
    fn load_subjects(&self, _reporting_year: i32) -> PanelResult<Vec<SubjectEpisodes>> {
        Ok(self.clone())
    }
}
