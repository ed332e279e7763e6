use crate::comms::message::Message;
use crate::comms::topic::Topic;
use crate::comms::transport::{Handler, Subscriber};
use crate::pipeline::{Consumer, PipelineError};
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{RepoError, Trade, TradeRepo};

/// Consumes trades from a pub/sub topic and stores them.
pub struct TradeProcessor {
    repo: Arc<dyn TradeRepo>,
    subscriber: Arc<dyn Subscriber<Trade>>,
}

impl TradeProcessor {
    pub fn new(repo: Arc<dyn TradeRepo>, subscriber: Arc<dyn Subscriber<Trade>>) -> Self {
        Self { repo, subscriber }
    }
}

struct TradeRecorder {
    repo: Arc<dyn TradeRepo>,
    failure: Option<RepoError>,
}

#[async_trait]
impl Handler<Trade> for TradeRecorder {
    async fn handle(&mut self, message: Message<Trade>) -> anyhow::Result<()> {
        let trade = message.into_payload();
        match self.repo.create_trade(&trade).await {
            Ok(id) => {
                info!(
                    "added trade id={} instrument_id={} size={} price={} timestamp={}",
                    id,
                    trade.get_instrument_id(),
                    trade.get_size(),
                    trade.get_price(),
                    trade.get_timestamp().to_rfc3339()
                );
                Ok(())
            }
            Err(err) => {
                self.failure = Some(err.clone());
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl Consumer for TradeProcessor {
    async fn consume(&self, topic: &Topic, cancel: &CancellationToken) -> Result<(), PipelineError> {
        let mut recorder = TradeRecorder {
            repo: self.repo.clone(),
            failure: None,
        };
        let result = self.subscriber.subscribe(topic.clone(), cancel, &mut recorder).await;
        match (result, recorder.failure.take()) {
            (Err(_), Some(err)) => Err(PipelineError::Persist(err)),
            (result, _) => result.map_err(PipelineError::Subscribe),
        }
    }
}
