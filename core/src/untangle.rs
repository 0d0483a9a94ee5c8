//! Interval untangler: turns possibly-overlapping weighted intervals into a
//! disjoint partition whose per-day magnitude is the sum over every input
//! interval covering it.
//!
//! Boundary sweep: every interval contributes `+daily` at its start and
//! `-daily` on the day after its end. Sorting the boundaries and walking them
//! once yields the minimal sub-intervals together with their coverage, for
//! any overlap multiplicity, in O(n log n).

use crate::{
    apportion::inclusive_days,
    error::{PanelError, PanelResult},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive date interval carrying a per-day magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedInterval {
    pub start: NaiveDate,
    pub end:   NaiveDate,
    pub daily: f64,
}

impl WeightedInterval {
    pub fn new(start: NaiveDate, end: NaiveDate, daily: f64) -> PanelResult<Self> {
        if end < start {
            return Err(PanelError::InvalidInterval { start, end });
        }
        Ok(Self { start, end, daily })
    }

    pub fn days(&self) -> PanelResult<u32> {
        inclusive_days(self.start, self.end)
    }

    /// Total magnitude carried by this interval.
    pub fn magnitude(&self) -> PanelResult<f64> {
        Ok(self.daily * f64::from(self.days()?))
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

struct Boundary {
    at:     NaiveDate,
    cover:  i64,
    weight: f64,
}

/// Disjoint, ordered partition of the union of `intervals`.
///
/// Gaps between inputs stay gaps. Adjacent segments with identical
/// magnitude are merged.
pub fn untangle(intervals: &[WeightedInterval]) -> PanelResult<Vec<WeightedInterval>> {
    let mut boundaries = Vec::with_capacity(intervals.len() * 2);
    for iv in intervals {
        if iv.end < iv.start {
            return Err(PanelError::InvalidInterval { start: iv.start, end: iv.end });
        }
        let after = iv
            .end
            .succ_opt()
            .ok_or(PanelError::InvalidInterval { start: iv.start, end: iv.end })?;
        boundaries.push(Boundary { at: iv.start, cover: 1, weight: iv.daily });
        boundaries.push(Boundary { at: after, cover: -1, weight: -iv.daily });
    }
    boundaries.sort_by_key(|b| b.at);

    let mut segments: Vec<WeightedInterval> = Vec::new();
    let mut cover = 0i64;
    let mut weight = 0.0f64;
    let mut i = 0;
    while i < boundaries.len() {
        let at = boundaries[i].at;
        while i < boundaries.len() && boundaries[i].at == at {
            cover += boundaries[i].cover;
            weight += boundaries[i].weight;
            i += 1;
        }
        if cover == 0 {
            // Drop accumulated rounding once nothing covers the axis.
            weight = 0.0;
            continue;
        }
        // A positive cover always has a closing boundary further on.
        let Some(next) = boundaries.get(i).map(|b| b.at) else {
            break;
        };
        let Some(end) = next.pred_opt() else {
            break;
        };
        push_merged(&mut segments, WeightedInterval { start: at, end, daily: weight });
    }
    Ok(segments)
}

fn push_merged(segments: &mut Vec<WeightedInterval>, seg: WeightedInterval) {
    if let Some(last) = segments.last_mut() {
        if last.daily == seg.daily && last.end.succ_opt() == Some(seg.start) {
            last.end = seg.end;
            return;
        }
    }
    segments.push(seg);
}
