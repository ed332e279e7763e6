use crate::comms::message::Message;
use crate::comms::topic::Topic;
use crate::comms::transport::{Closer, Publisher};
use crate::pipeline::PipelineError;
use log::{debug, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{Trade, TradeSource};

/// Publishes every trade of `source` on `topic`, then closes the topic.
///
/// A failure cancels `cancel` so the consuming side unwinds as well.
pub(crate) async fn run_feed<S, P>(
    mut source: S,
    publisher: Arc<P>,
    topic: Topic,
    cancel: CancellationToken,
) -> Result<u64, PipelineError>
where
    S: TradeSource,
    P: Publisher<Trade> + Closer + ?Sized,
{
    let result = publish_all(&mut source, publisher.as_ref(), &topic, &cancel).await;
    match &result {
        Ok(published) => debug!("feed finished topic={} published={}", topic, published),
        Err(err) if err.is_cancelled() => debug!("feed cancelled topic={}", topic),
        Err(err) => {
            warn!("feed failed topic={}: {}", topic, err);
            cancel.cancel();
        }
    }
    result
}

async fn publish_all<S, P>(
    source: &mut S,
    publisher: &P,
    topic: &Topic,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError>
where
    S: TradeSource,
    P: Publisher<Trade> + Closer + ?Sized,
{
    // Publishing before the consumer subscribed would fail with TopicNotOpen.
    publisher
        .wait_subscribed(topic, cancel)
        .await
        .map_err(PipelineError::Publish)?;

    let mut published = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            next = source.next() => next.map_err(PipelineError::Source)?,
        };
        let Some(trade) = next else { break };
        publisher
            .publish(Message::new(topic.clone(), trade), cancel)
            .await
            .map_err(PipelineError::Publish)?;
        published += 1;
    }

    publisher.close(topic).await.map_err(PipelineError::Close)?;
    Ok(published)
}
