//! Pipeline orchestration.
//!
//! A pipeline wires a [`TradeSource`] to a [`Consumer`] through a pub/sub transport.
//! The feed runs on its own task while the consumer runs on the caller's task. Both
//! share one cancellation scope derived from the caller's token: a failure on either
//! side cancels the other, and the root cause is reported.

mod errors;
mod feed;


use crate::comms::topic::Topic;
use crate::comms::transport::{Closer, Publisher};
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{Trade, TradeSource};

pub use errors::PipelineError;

/// Parameters of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Topic the trades travel on.
    topic: Topic,
}

impl PipelineConfig {
    pub fn new(topic: Topic) -> Self {
        Self { topic }
    }

    pub fn get_topic(&self) -> &Topic {
        &self.topic
    }
}

/// The subscribing half of a pipeline.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribes to `topic` and processes its trades until the topic is closed.
    async fn consume(&self, topic: &Topic, cancel: &CancellationToken) -> Result<(), PipelineError>;
}

/// Runs one pipeline to completion.
///
/// # Arguments
///
/// * `source` - Produces the trades. It is prepared here and must not have been prepared before.
/// * `pubsub` - Transport between the feed and the consumer.
/// * `consumer` - Subscribes to the topic and processes the trades.
/// * `config` - Pipeline parameters.
/// * `cancel` - Governs the whole run.
///
/// # Returns
///
/// * `Ok(())` once every trade was consumed.
/// * `Err(PipelineError)` with the root cause otherwise. A cancellation error is only
///   returned when no stage failed on its own.
pub async fn run_pipeline<S, P>(
    mut source: S,
    pubsub: Arc<P>,
    consumer: &dyn Consumer,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<(), PipelineError>
where
    S: TradeSource + 'static,
    P: Publisher<Trade> + Closer + ?Sized + 'static,
{
    source.prepare().await.map_err(PipelineError::Prepare)?;

    let scope = cancel.child_token();
    let feed = tokio::spawn(feed::run_feed(
        source,
        pubsub,
        config.get_topic().clone(),
        scope.clone(),
    ));

    let consumed = consumer.consume(config.get_topic(), &scope).await;
    if let Err(err) = &consumed {
        if !err.is_cancelled() {
            error!("consumer failed topic={}: {}", config.get_topic(), err);
        }
        scope.cancel();
    }

    let fed = match feed.await {
        Ok(fed) => fed,
        Err(err) => Err(PipelineError::FeedPanicked(err.to_string())),
    };

    match (consumed, fed) {
        (Ok(()), Ok(published)) => {
            info!(
                "pipeline finished topic={} trades={}",
                config.get_topic(),
                published
            );
            Ok(())
        }
        // The feed failed first and the consumer only observed the cancellation.
        (Err(consumer), Err(feed)) if consumer.is_cancelled() && !feed.is_cancelled() => Err(feed),
        (Err(consumer), _) => Err(consumer),
        (Ok(()), Err(feed)) => Err(feed),
    }
}
