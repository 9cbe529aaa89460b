use chrono::NaiveDate;
use thiserror::Error;

/// Hard-failure taxonomy for a trend run.
///
/// Two outcomes are deliberately *not* errors: a row whose field count does
/// not match the header is silently skipped, and too few qualifying weekly
/// buckets is reported through [`crate::fit::FitOutcome::InsufficientData`].
/// Everything here aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dataset header is missing expected column `{0}`; the source schema may have changed")]
    SchemaDrift(String),

    #[error("dataset is empty: no header row")]
    EmptyDataset,

    #[error("malformed date field `{0}` (expected YYYY-MM-DD)")]
    MalformedDate(String),

    #[error("event dated {date} precedes the epoch {epoch}")]
    PreEpochEvent { date: NaiveDate, epoch: NaiveDate },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, Error>;
