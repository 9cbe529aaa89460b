//! Monkeypox case-trend pipeline.
//!
//! A single batch pass over the public case line list: parse rows, extract
//! dated events, bucket them by day and by week, fit an exponential growth
//! model to the recent weekly totals, and emit tables and charts.
//!
//! Data flows strictly forward: raw file → records → events → daily
//! histogram → weekly series → fit → artifacts. Nothing persists between
//! runs except the cached download.

pub mod error;
pub mod event;
pub mod fetch;
pub mod fit;
pub mod histogram;
pub mod nations;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod weekly;

pub use error::{Error, Result};
pub use event::{Event, NationFilter, StatusFilter};
pub use fit::{FitOutcome, FitResult, fit_trend};
pub use histogram::{DailyHistogram, default_epoch};
pub use weekly::{
    DEFAULT_REPORTING_LAG_FACTOR, WeeklyBucket, aggregate_weekly, apply_reporting_lag_correction,
};
