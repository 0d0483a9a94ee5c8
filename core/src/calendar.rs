//! Calendar arithmetic: month lengths and the observation window.

use crate::types::MonthKey;
use chrono::NaiveDate;

const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1–12) of `year`.
///
/// Callers must pass a valid month; the apportioner and `MonthKey` never
/// construct anything else.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        MONTH_DAYS[(month - 1) as usize]
    }
}

/// Contiguous months from the month of `first_start` through December of
/// `reporting_year`. Empty when `first_start` lies after the reporting year.
pub fn observation_window(first_start: NaiveDate, reporting_year: i32) -> Vec<MonthKey> {
    let last = MonthKey::december(reporting_year);
    let mut key = MonthKey::of(first_start);
    let mut window = Vec::new();
    while key <= last {
        window.push(key);
        key = key.next();
    }
    window
}
