use crate::position::builder::BuilderConfig;
use crate::position::errors::BuildError;
use chrono::{DateTime, Utc};
use tracker::{InstrumentId, Position, Trade};

/// The running position of a build.
#[derive(Debug, Clone, PartialEq)]
struct Accumulator {
    instrument_id: InstrumentId,
    size: i64,
    anchor: DateTime<Utc>,
    // Timestamp of the last trade folded in, or the anchor before any trade.
    last_trade: DateTime<Utc>,
}

impl Accumulator {
    fn from_position(position: &Position) -> Self {
        Self {
            instrument_id: position.get_instrument_id(),
            size: position.get_size(),
            anchor: position.get_timestamp(),
            last_trade: position.get_timestamp(),
        }
    }

    fn snapshot(&self) -> Position {
        Position::new(self.instrument_id, self.size, self.anchor)
    }
}

/// Synchronous bucketing state machine behind [`BinnedBuilder`](super::BinnedBuilder).
///
/// A trade less than one bucket width after the current anchor is merged silently. A
/// trade at or beyond the bucket end moves the anchor to its own timestamp and emits a
/// snapshot. With a bucket width of zero every trade is emitted.
///
/// Without an initial position the fold anchors at a flat position on the first trade's
/// instrument and timestamp.
#[derive(Debug, Clone)]
pub struct PositionFold {
    bucket_width: i64,
    accumulator: Option<Accumulator>,
}

impl PositionFold {
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            bucket_width: i64::try_from(config.get_bucket_width_secs()).unwrap_or(i64::MAX),
            accumulator: config.get_initial_position().map(Accumulator::from_position),
        }
    }

    /// Folds one trade into the accumulator.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(position))` when the trade closed the current bucket.
    /// * `Ok(None)` when the trade was merged into the current bucket.
    /// * `Err(BuildError)` if the trade belongs to another instrument or is older than
    ///   the last trade folded in. The accumulator is left untouched.
    pub fn apply(&mut self, trade: &Trade) -> Result<Option<Position>, BuildError> {
        let bucket_width = self.bucket_width;
        let acc = self.accumulator.get_or_insert_with(|| Accumulator {
            instrument_id: trade.get_instrument_id(),
            size: 0,
            anchor: trade.get_timestamp(),
            last_trade: trade.get_timestamp(),
        });

        if trade.get_instrument_id() != acc.instrument_id {
            return Err(BuildError::InstrumentMismatch {
                expected: acc.instrument_id,
                actual: trade.get_instrument_id(),
            });
        }
        if trade.get_unix_seconds() < acc.last_trade.timestamp() {
            return Err(BuildError::NotSorted {
                trade: trade.get_timestamp(),
                last: acc.last_trade,
            });
        }

        let elapsed = trade.get_unix_seconds() - acc.anchor.timestamp();
        acc.size += trade.get_size();
        acc.last_trade = trade.get_timestamp();
        if elapsed < bucket_width {
            return Ok(None);
        }
        acc.anchor = trade.get_timestamp();
        Ok(Some(acc.snapshot()))
    }

    /// The accumulated, not yet emitted, position.
    pub fn pending(&self) -> Option<Position> {
        self.accumulator.as_ref().map(Accumulator::snapshot)
    }
}
