use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracker::InstrumentId;

/// Terminal conditions of a position build.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("instrument mismatch: expected {expected}, got {actual}")]
    InstrumentMismatch {
        expected: InstrumentId,
        actual: InstrumentId,
    },
    #[error(
        "not sorted: trade timestamp {} is before last trade timestamp {}",
        rfc3339(.trade),
        rfc3339(.last)
    )]
    NotSorted {
        trade: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    #[error("context cancelled")]
    Cancelled,
    #[error("position output closed")]
    OutputClosed,
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

fn rfc3339(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
