//! Position snapshots.

use crate::model::instrument::InstrumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated size of one instrument as of a timestamp.
///
/// A snapshot is created for every emission and never mutated once handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Identifier assigned by the sink, `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    instrument_id: InstrumentId,
    /// Sum of the sizes of every trade folded into this position.
    size: i64,
    timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(instrument_id: InstrumentId, size: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            instrument_id,
            size,
            timestamp,
        }
    }

    /// A flat position for `instrument_id` anchored at `timestamp`.
    pub fn zero(instrument_id: InstrumentId, timestamp: DateTime<Utc>) -> Self {
        Self::new(instrument_id, 0, timestamp)
    }

    /// Returns a copy of the position carrying the identifier assigned by the sink.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn get_id(&self) -> Option<i64> {
        self.id
    }

    pub fn get_instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    pub fn get_size(&self) -> i64 {
        self.size
    }

    pub fn get_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get_unix_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
