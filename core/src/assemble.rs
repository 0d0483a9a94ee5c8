//! Monthly record assembler: one record per subject and month of the
//! observation window.

use crate::{
    overlap::OverlapMonth,
    primary::PrimarySlot,
    secondary::{SecondarySlot, SecondarySlots},
    types::{MonthKey, SubjectId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub subject_id:       SubjectId,
    pub year:             i32,
    pub month:            u32,
    pub calendar_days:    u32,
    pub primary:          Option<PrimarySlot>,
    pub secondary_1:      Option<SecondarySlot>,
    pub secondary_2:      Option<SecondarySlot>,
    pub overlap_a_days:   u32,
    pub overlap_b_days:   u32,
    pub overlap_b_points: f64,
}

impl MonthlyRecord {
    pub fn key(&self) -> MonthKey {
        MonthKey::new(self.year, self.month)
    }
}

/// Per-month results of every stream for one subject.
#[derive(Debug, Default)]
pub struct SubjectStreams {
    pub primary:   BTreeMap<MonthKey, PrimarySlot>,
    pub secondary: BTreeMap<MonthKey, SecondarySlots>,
    pub overlap_a: BTreeMap<MonthKey, OverlapMonth>,
    pub overlap_b: BTreeMap<MonthKey, OverlapMonth>,
}

/// Left-merge every stream onto the calendar skeleton `window`.
/// Stream entries outside the window are ignored.
pub fn assemble(
    subject_id: &SubjectId,
    window: &[MonthKey],
    mut streams: SubjectStreams,
) -> Vec<MonthlyRecord> {
    window
        .iter()
        .map(|&key| {
            let [secondary_1, secondary_2] =
                streams.secondary.remove(&key).unwrap_or([None, None]);
            let a = streams.overlap_a.get(&key).copied().unwrap_or_default();
            let b = streams.overlap_b.get(&key).copied().unwrap_or_default();
            MonthlyRecord {
                subject_id: subject_id.clone(),
                year: key.year,
                month: key.month,
                calendar_days: key.days(),
                primary: streams.primary.remove(&key),
                secondary_1,
                secondary_2,
                overlap_a_days: a.days,
                overlap_b_days: b.days,
                overlap_b_points: b.points,
            }
        })
        .collect()
}
