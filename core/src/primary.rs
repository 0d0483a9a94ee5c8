//! Primary resolver: picks one primary status per month.
//!
//! Every primary episode is apportioned into monthly contributions. Per
//! month the contribution with the highest per-day register rate takes the
//! primary slot; the others are folded into a single secondary-job
//! contribution for the secondary ranker.
//!
//! Equal rates are broken by label, then episode start, then input order,
//! so the outcome never depends on sort stability.

use crate::{
    apportion::apportion,
    config::AdjustmentFactors,
    episode::Episode,
    error::{PanelError, PanelResult},
    secondary::SecondaryContribution,
    types::MonthKey,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One primary episode's share of one month.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryContribution {
    pub key:        MonthKey,
    pub label:      String,
    pub days:       u32,
    pub register:   f64,
    pub points:     f64,
    /// Episode register value per day, after any regional adjustment.
    pub daily_rate: f64,
    pub start:      NaiveDate,
    /// Position of the source episode among the subject's primary episodes.
    pub order:      usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimarySlot {
    pub label:    String,
    pub days:     u32,
    pub register: f64,
    pub points:   f64,
}

#[derive(Debug, Default)]
pub struct PrimaryResolution {
    pub slots:         BTreeMap<MonthKey, PrimarySlot>,
    /// One summed contribution per month that had outranked primaries.
    pub secondary_job: Vec<SecondaryContribution>,
}

/// Apportion classified primary episodes, keeping months up to
/// `window_end`. Adjusted labels are divided by their month's factor.
pub fn primary_contributions(
    classified: &[(&str, &Episode)],
    window_end: MonthKey,
    adjusted_labels: &BTreeSet<String>,
    factors: &dyn AdjustmentFactors,
) -> PanelResult<Vec<PrimaryContribution>> {
    let mut out = Vec::new();
    for (order, (label, ep)) in classified.iter().enumerate() {
        let daily_rate = ep.daily_register()?;
        let daily_points = ep.daily_points()?;
        let adjusted = adjusted_labels.contains(*label);

        for share in apportion(ep.start_date, ep.end_date, Some(ep.register_value))? {
            if share.key > window_end {
                break;
            }
            let mut register = share.share.unwrap_or_default();
            let mut rate = daily_rate;
            if adjusted {
                let factor = factors.factor(share.key).ok_or(
                    PanelError::MissingAdjustmentFactor {
                        year:  share.key.year,
                        month: share.key.month,
                    },
                )?;
                register /= factor;
                rate /= factor;
            }
            out.push(PrimaryContribution {
                key: share.key,
                label: label.to_string(),
                days: share.days,
                register,
                points: daily_points * f64::from(share.days),
                daily_rate: rate,
                start: ep.start_date,
                order,
            });
        }
    }
    Ok(out)
}

/// `Less` means `a` outranks `b`.
fn precedence(a: &PrimaryContribution, b: &PrimaryContribution) -> Ordering {
    b.daily_rate
        .total_cmp(&a.daily_rate)
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.order.cmp(&b.order))
}

/// Pick each month's winner and fold the losers into `secondary_job_label`.
pub fn resolve_primary(
    contributions: Vec<PrimaryContribution>,
    secondary_job_label: &str,
) -> PrimaryResolution {
    let mut by_month: BTreeMap<MonthKey, Vec<PrimaryContribution>> = BTreeMap::new();
    for c in contributions {
        by_month.entry(c.key).or_default().push(c);
    }

    let mut resolution = PrimaryResolution::default();
    for (key, mut month) in by_month {
        month.sort_by(precedence);
        let mut rest = month.into_iter();
        let Some(winner) = rest.next() else {
            continue;
        };

        let mut job: Option<SecondaryContribution> = None;
        for loser in rest {
            let entry = job.get_or_insert_with(|| SecondaryContribution {
                key,
                label: secondary_job_label.to_string(),
                days: 0,
                points: 0.0,
            });
            entry.days += loser.days;
            entry.points += loser.points;
        }
        if let Some(job) = job {
            resolution.secondary_job.push(job);
        }

        resolution.slots.insert(
            key,
            PrimarySlot {
                label:    winner.label,
                days:     winner.days,
                register: winner.register,
                points:   winner.points,
            },
        );
    }
    resolution
}
