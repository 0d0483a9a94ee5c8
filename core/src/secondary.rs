//! Secondary ranker: keeps the two highest-priority secondary statuses
//! of each month.

use crate::{
    apportion::apportion,
    episode::Episode,
    error::PanelResult,
    rules::CategoryPriority,
    types::MonthKey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One secondary status's share of one month.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryContribution {
    pub key:    MonthKey,
    pub label:  String,
    pub days:   u32,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondarySlot {
    pub label:  String,
    pub days:   u32,
    pub points: f64,
    /// 1 or 2.
    pub rank:   u8,
}

/// Slot 1 and slot 2 of a month.
pub type SecondarySlots = [Option<SecondarySlot>; 2];

/// Apportion classified secondary episodes (days and points only),
/// keeping months up to `window_end`.
pub fn secondary_contributions(
    classified: &[(&str, &Episode)],
    window_end: MonthKey,
) -> PanelResult<Vec<SecondaryContribution>> {
    let mut out = Vec::new();
    for (label, ep) in classified {
        for share in apportion(ep.start_date, ep.end_date, Some(ep.point_value))? {
            if share.key > window_end {
                break;
            }
            out.push(SecondaryContribution {
                key:    share.key,
                label:  label.to_string(),
                days:   share.days,
                points: share.share.unwrap_or_default(),
            });
        }
    }
    Ok(out)
}

/// Rank each month's contributions by `priority` and keep the top two.
///
/// Contributions sharing a label within a month are combined first: days
/// and points add up. A summed secondary-job slot can therefore report more
/// days than the month has.
pub fn rank_secondary(
    contributions: impl IntoIterator<Item = SecondaryContribution>,
    priority: &CategoryPriority,
) -> PanelResult<BTreeMap<MonthKey, SecondarySlots>> {
    // month -> rank -> (label, days, points)
    let mut by_month: BTreeMap<MonthKey, BTreeMap<usize, (String, u32, f64)>> = BTreeMap::new();
    for c in contributions {
        let rank = priority.rank_of(&c.label)?;
        let entry = by_month
            .entry(c.key)
            .or_default()
            .entry(rank)
            .or_insert_with(|| (c.label.clone(), 0, 0.0));
        entry.1 += c.days;
        entry.2 += c.points;
    }

    let mut ranked = BTreeMap::new();
    for (key, month) in by_month {
        let mut slots: SecondarySlots = [None, None];
        for (i, (slot, (_, (label, days, points)))) in slots.iter_mut().zip(month).enumerate() {
            *slot = Some(SecondarySlot {
                label,
                days,
                points,
                rank: i as u8 + 1,
            });
        }
        ranked.insert(key, slots);
    }
    Ok(ranked)
}
