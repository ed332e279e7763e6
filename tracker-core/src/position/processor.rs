use crate::comms::handoff::{self, HandoffSender};
use crate::comms::message::Message;
use crate::comms::topic::Topic;
use crate::comms::transport::{Handler, Subscriber};
use crate::pipeline::{Consumer, PipelineError};
use crate::position::builder::PositionBuilder;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{Position, PositionRepo, Trade};

/// Aggregates trades from a pub/sub topic into positions and stores them.
///
/// Three stages run concurrently on the calling task, joined by handoff channels:
/// forwarding subscribed trades to the builder, building, and persisting every
/// emitted position. The first failing stage ends the whole consumption.
pub struct PositionProcessor {
    repo: Arc<dyn PositionRepo>,
    subscriber: Arc<dyn Subscriber<Trade>>,
    builder: Box<dyn PositionBuilder>,
}

impl PositionProcessor {
    /// Creates a new PositionProcessor.
    ///
    /// # Arguments
    ///
    /// * `repo` - Sink for the built positions.
    /// * `subscriber` - Transport the trades are read from.
    /// * `builder` - Folds the trades into positions.
    pub fn new(
        repo: Arc<dyn PositionRepo>,
        subscriber: Arc<dyn Subscriber<Trade>>,
        builder: Box<dyn PositionBuilder>,
    ) -> Self {
        Self {
            repo,
            subscriber,
            builder,
        }
    }
}

/// Hands every subscribed trade over to the builder.
struct TradeForwarder {
    trades: HandoffSender<Trade>,
    cancel: CancellationToken,
}

#[async_trait]
impl Handler<Trade> for TradeForwarder {
    async fn handle(&mut self, message: Message<Trade>) -> anyhow::Result<()> {
        self.trades.send(message.into_payload(), &self.cancel).await?;
        Ok(())
    }
}

#[async_trait]
impl Consumer for PositionProcessor {
    async fn consume(&self, topic: &Topic, cancel: &CancellationToken) -> Result<(), PipelineError> {
        let (trade_tx, trade_rx) = handoff::channel::<Trade>();
        let (position_tx, mut position_rx) = handoff::channel::<Position>();

        let forward = async move {
            let mut forwarder = TradeForwarder {
                trades: trade_tx,
                cancel: cancel.clone(),
            };
            // Dropping the forwarder on return ends the builder's input.
            self.subscriber
                .subscribe(topic.clone(), cancel, &mut forwarder)
                .await
                .map_err(PipelineError::Subscribe)
        };

        let build = async move {
            self.builder
                .build(cancel, trade_rx, position_tx)
                .await
                .map_err(PipelineError::Build)
        };

        let persist = async move {
            while let Some(position) = position_rx
                .recv(cancel)
                .await
                .map_err(|_| PipelineError::Cancelled)?
            {
                let id = self
                    .repo
                    .create_position(&position)
                    .await
                    .map_err(PipelineError::Persist)?;
                info!(
                    "added position id={} instrument_id={} size={} timestamp={}",
                    id,
                    position.get_instrument_id(),
                    position.get_size(),
                    position.get_timestamp().to_rfc3339()
                );
            }
            Ok::<(), PipelineError>(())
        };

        tokio::try_join!(forward, build, persist).map(|_| ())
    }
}
