//! Builds a monthly panel from date-stamped life and employment episodes.
//!
//! Every subject's episodes are classified by declarative rules, spread
//! over calendar months, arbitrated per month, and assembled into one
//! `MonthlyRecord` per month of the subject's observation window.

pub mod apportion;
pub mod assemble;
pub mod calendar;
pub mod classify;
pub mod config;
pub mod engine;
pub mod episode;
pub mod error;
pub mod overlap;
pub mod primary;
pub mod rules;
pub mod secondary;
pub mod sink;
pub mod store;
pub mod types;
pub mod untangle;
