//! Trade events.

use crate::model::instrument::InstrumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable execution event for an instrument.
///
/// Trades are produced by a trade source, travel once through the pipeline and are
/// never mutated. The identifier is only known once the sink has stored the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Identifier assigned by the sink, `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    /// The instrument traded.
    instrument_id: InstrumentId,
    /// Signed quantity traded.
    size: i64,
    /// Execution price.
    price: f64,
    /// Wall-clock instant of the execution.
    timestamp: DateTime<Utc>,
}

impl Trade {
    /// Creates a new, not yet persisted, trade.
    ///
    /// # Arguments
    ///
    /// * `instrument_id` - The instrument traded.
    /// * `size` - Signed quantity.
    /// * `price` - Execution price.
    /// * `timestamp` - Execution time.
    pub fn new(instrument_id: InstrumentId, size: i64, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            instrument_id,
            size,
            price,
            timestamp,
        }
    }

    /// Returns a copy of the trade carrying the identifier assigned by the sink.
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

    pub fn get_price(&self) -> f64 {
        self.price
    }

    pub fn get_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp truncated to whole seconds, the resolution used for ordering.
    pub fn get_unix_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
