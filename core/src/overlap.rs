//! Overlap categories: untangle a subject's overlapping episodes of one
//! overlap label, then count days (and points) per month.

use crate::{
    apportion::apportion,
    episode::Episode,
    error::PanelResult,
    types::MonthKey,
    untangle::{untangle, WeightedInterval},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapMonth {
    pub days:   u32,
    pub points: f64,
}

/// Per-day point weights of `episodes`, or zero weights when the label
/// tracks no magnitude.
pub fn weighted_intervals(
    episodes: &[&Episode],
    track_points: bool,
) -> PanelResult<Vec<WeightedInterval>> {
    episodes
        .iter()
        .map(|ep| {
            let daily = if track_points { ep.daily_points()? } else { 0.0 };
            WeightedInterval::new(ep.start_date, ep.end_date, daily)
        })
        .collect()
}

/// Month-level days and points of the untangled union of `episodes`.
pub fn overlap_months(
    episodes: &[&Episode],
    track_points: bool,
) -> PanelResult<BTreeMap<MonthKey, OverlapMonth>> {
    let intervals = weighted_intervals(episodes, track_points)?;
    let mut months: BTreeMap<MonthKey, OverlapMonth> = BTreeMap::new();
    for seg in untangle(&intervals)? {
        let total = if track_points { Some(seg.magnitude()?) } else { None };
        for share in apportion(seg.start, seg.end, total)? {
            let month = months.entry(share.key).or_default();
            month.days += share.days;
            month.points += share.share.unwrap_or_default();
        }
    }
    Ok(months)
}
