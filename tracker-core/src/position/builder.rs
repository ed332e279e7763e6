use crate::comms::handoff::{HandoffError, HandoffReceiver, HandoffSender};
use crate::position::errors::BuildError;
use crate::position::fold::PositionFold;
use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;
use tracker::{Position, Trade};

/// Bucket width used when none is configured.
pub const DEFAULT_BUCKET_WIDTH_SECS: u64 = 1;

/// Parameters of a position build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Width of a bucket in whole seconds. Zero emits a position for every trade.
    bucket_width_secs: u64,
    /// Position the fold starts from. When absent the fold starts flat at the first
    /// trade.
    initial_position: Option<Position>,
}

impl BuilderConfig {
    pub fn new(bucket_width_secs: u64) -> Self {
        Self {
            bucket_width_secs,
            initial_position: None,
        }
    }

    pub fn with_initial_position(mut self, position: Position) -> Self {
        self.initial_position = Some(position);
        self
    }

    pub fn get_bucket_width_secs(&self) -> u64 {
        self.bucket_width_secs
    }

    pub fn get_initial_position(&self) -> Option<&Position> {
        self.initial_position.as_ref()
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_WIDTH_SECS)
    }
}

/// Builds positions from a stream of trades.
#[async_trait]
pub trait PositionBuilder: Send + Sync {
    /// Consumes `trades` until they end, emitting positions to `positions`.
    ///
    /// The trades must belong to a single instrument and be sorted by timestamp. The
    /// output is closed when the build returns, whatever the outcome.
    async fn build(
        &self,
        cancel: &CancellationToken,
        trades: HandoffReceiver<Trade>,
        positions: HandoffSender<Position>,
    ) -> Result<(), BuildError>;
}

/// Builds positions from trades that fall within fixed-width time buckets.
pub struct BinnedBuilder {
    config: BuilderConfig,
}

impl BinnedBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PositionBuilder for BinnedBuilder {
    async fn build(
        &self,
        cancel: &CancellationToken,
        mut trades: HandoffReceiver<Trade>,
        positions: HandoffSender<Position>,
    ) -> Result<(), BuildError> {
        let mut fold = PositionFold::new(&self.config);
        loop {
            let trade = match trades.recv(cancel).await {
                Ok(Some(trade)) => trade,
                Ok(None) => break,
                Err(_) => return Err(BuildError::Cancelled),
            };
            if let Some(position) = fold.apply(&trade)? {
                positions.send(position, cancel).await.map_err(|err| match err {
                    HandoffError::Cancelled => BuildError::Cancelled,
                    HandoffError::Closed => BuildError::OutputClosed,
                })?;
            }
        }
        if let Some(pending) = fold.pending() {
            // A partially filled bucket is not flushed.
            debug!(
                "trades exhausted instrument_id={} size={} anchor={}",
                pending.get_instrument_id(),
                pending.get_size(),
                pending.get_timestamp()
            );
        }
        Ok(())
    }
}
