//! Publish/subscribe abstractions.
//!
//! Implementation details (in-memory, broker backed) are hidden behind these traits so
//! the pipelines only depend on the contract: one subscriber per topic, blocking
//! handoff on publish, explicit close.

use crate::comms::handoff::HandoffError;
use crate::comms::message::Message;
use crate::comms::topic::Topic;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum PubSubError {
    #[error("topic {0} already subscribed")]
    AlreadySubscribed(Topic),
    #[error("topic {0} closed")]
    TopicClosed(Topic),
    #[error("topic {0} not open")]
    TopicNotOpen(Topic),
    #[error("context cancelled")]
    Cancelled,
    #[error("handler failed: {0:#}")]
    Handler(#[source] anyhow::Error),
}

impl PubSubError {
    /// True when the error is a consequence of cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        match self {
            PubSubError::Cancelled => true,
            PubSubError::Handler(err) => matches!(
                err.downcast_ref::<HandoffError>(),
                Some(HandoffError::Cancelled)
            ),
            _ => false,
        }
    }
}

/// Processes the messages delivered to a subscriber, one at a time.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send {
    async fn handle(&mut self, message: Message<T>) -> anyhow::Result<()>;
}

/// Adapts a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<T, F> Handler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: FnMut(Message<T>) -> anyhow::Result<()> + Send,
{
    async fn handle(&mut self, message: Message<T>) -> anyhow::Result<()> {
        (self.0)(message)
    }
}

/// Supports publishing messages to a topic.
#[async_trait]
pub trait Publisher<T: Send + 'static>: Send + Sync {
    /// Delivers `message` to the subscriber of its topic.
    ///
    /// Blocks until the subscriber accepts the message or `cancel` fires.
    ///
    /// # Returns
    ///
    /// * `Err(PubSubError::TopicNotOpen)` if nobody subscribed to the topic.
    /// * `Err(PubSubError::TopicClosed)` if the topic has been closed.
    async fn publish(&self, message: Message<T>, cancel: &CancellationToken) -> Result<(), PubSubError>;

    /// Waits until a subscriber is registered for `topic`.
    ///
    /// # Returns
    ///
    /// * `Err(PubSubError::TopicClosed)` if the topic was already closed.
    async fn wait_subscribed(&self, topic: &Topic, cancel: &CancellationToken) -> Result<(), PubSubError>;
}

/// Supports subscribing to messages on a topic.
#[async_trait]
pub trait Subscriber<T: Send + 'static>: Send + Sync {
    /// Registers the caller as the sole subscriber of `topic` and feeds every message
    /// to `handler` until the topic is closed.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the topic has been closed.
    /// * `Err(PubSubError::AlreadySubscribed)` if the topic already had a subscriber.
    /// * `Err(PubSubError::Cancelled)` if `cancel` fired.
    /// * `Err(PubSubError::Handler)` if the handler failed.
    async fn subscribe(
        &self,
        topic: Topic,
        cancel: &CancellationToken,
        handler: &mut dyn Handler<T>,
    ) -> Result<(), PubSubError>;
}

/// Supports closing a topic.
#[async_trait]
pub trait Closer: Send + Sync {
    /// Signals end-of-stream to the subscriber of `topic`.
    async fn close(&self, topic: &Topic) -> Result<(), PubSubError>;
}

/// Supports both publishing and subscribing, as well as closing topics.
pub trait PublisherSubscriber<T: Send + 'static>: Publisher<T> + Subscriber<T> + Closer {}

impl<T, P> PublisherSubscriber<T> for P
where
    T: Send + 'static,
    P: Publisher<T> + Subscriber<T> + Closer,
{
}
