//! Interval apportioner: splits an inclusive date interval into per-month
//! day counts and, optionally, per-month shares of a total magnitude.
//!
//! The magnitude is spread at a constant per-day rate, so the shares of an
//! interval always sum back to its total.

use crate::{
    error::{PanelError, PanelResult},
    types::MonthKey,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One month's slice of an apportioned interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthShare {
    pub key:   MonthKey,
    pub days:  u32,
    pub share: Option<f64>,
}

/// Inclusive day length of `[start, end]`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> PanelResult<u32> {
    if end < start {
        return Err(PanelError::InvalidInterval { start, end });
    }
    Ok((end - start).num_days() as u32 + 1)
}

/// Split `[start, end]` into months, ordered by (year, month).
///
/// With `total`, every entry carries `total / length * days`; without it,
/// shares are `None` and only day counts are produced.
pub fn apportion(
    start: NaiveDate,
    end: NaiveDate,
    total: Option<f64>,
) -> PanelResult<Vec<MonthShare>> {
    let length = inclusive_days(start, end)?;
    let rate = total.map(|t| t / f64::from(length));

    let first = MonthKey::of(start);
    let last = MonthKey::of(end);

    let mut shares = Vec::new();
    let mut key = first;
    loop {
        let days = if first == last {
            length
        } else if key == first {
            key.days() - start.day() + 1
        } else if key == last {
            end.day()
        } else {
            key.days()
        };
        shares.push(MonthShare {
            key,
            days,
            share: rate.map(|r| r * f64::from(days)),
        });
        if key == last {
            break;
        }
        key = key.next();
    }
    Ok(shares)
}
