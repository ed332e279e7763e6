use crate::comms::handoff::{self, HandoffError, HandoffSender};
use crate::comms::message::Message;
use crate::comms::topic::Topic;
use crate::comms::transport::{Closer, Handler, PubSubError, Publisher, Subscriber};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

enum TopicState<T> {
    Subscribed(HandoffSender<Message<T>>),
    Closed,
}

/// In-memory pub/sub transport.
///
/// Supports exactly one subscriber per topic for the whole lifetime of the topic.
/// Publishing hands each message directly to the subscriber, nothing is buffered.
pub struct MemoryPubSub<T> {
    topics: Mutex<HashMap<Topic, TopicState<T>>>,
    // Bumped on every registration change so publishers can wait for a subscriber.
    changes: watch::Sender<u64>,
}

impl<T> MemoryPubSub<T> {
    /// Creates a new, empty MemoryPubSub.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            topics: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, TopicState<T>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    fn mark_closed(&self, topic: &Topic) {
        self.topics().insert(topic.clone(), TopicState::Closed);
        self.notify();
    }
}

impl<T> Default for MemoryPubSub<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Publisher<T> for MemoryPubSub<T>
where
    T: Send + 'static,
{
    async fn publish(&self, message: Message<T>, cancel: &CancellationToken) -> Result<(), PubSubError> {
        let topic = message.topic().clone();
        let sender = match self.topics().get(&topic) {
            None => return Err(PubSubError::TopicNotOpen(topic)),
            Some(TopicState::Closed) => return Err(PubSubError::TopicClosed(topic)),
            Some(TopicState::Subscribed(sender)) => sender.clone(),
        };
        sender.send(message, cancel).await.map_err(|err| match err {
            HandoffError::Cancelled => PubSubError::Cancelled,
            HandoffError::Closed => PubSubError::TopicClosed(topic),
        })
    }

    async fn wait_subscribed(&self, topic: &Topic, cancel: &CancellationToken) -> Result<(), PubSubError> {
        let mut changes = self.changes.subscribe();
        loop {
            match self.topics().get(topic) {
                Some(TopicState::Subscribed(_)) => return Ok(()),
                Some(TopicState::Closed) => return Err(PubSubError::TopicClosed(topic.clone())),
                None => {}
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PubSubError::Cancelled),
                changed = changes.changed() => {
                    changed.map_err(|_| PubSubError::TopicNotOpen(topic.clone()))?;
                }
            }
        }
    }
}

#[async_trait]
impl<T> Subscriber<T> for MemoryPubSub<T>
where
    T: Send + 'static,
{
    async fn subscribe(
        &self,
        topic: Topic,
        cancel: &CancellationToken,
        handler: &mut dyn Handler<T>,
    ) -> Result<(), PubSubError> {
        let mut receiver = {
            let mut topics = self.topics();
            if topics.contains_key(&topic) {
                return Err(PubSubError::AlreadySubscribed(topic));
            }
            let (sender, receiver) = handoff::channel();
            topics.insert(topic.clone(), TopicState::Subscribed(sender));
            receiver
        };
        // Marks the topic closed however the subscription ends, including when this
        // future is dropped before completion.
        let _registration = Registration {
            pubsub: self,
            topic: &topic,
        };
        self.notify();
        debug!("subscribed to topic {}", topic);

        loop {
            match receiver.recv(cancel).await {
                Ok(Some(message)) => handler.handle(message).await.map_err(PubSubError::Handler)?,
                Ok(None) => return Ok(()),
                Err(_) => return Err(PubSubError::Cancelled),
            }
        }
    }
}

struct Registration<'a, T> {
    pubsub: &'a MemoryPubSub<T>,
    topic: &'a Topic,
}

impl<T> Drop for Registration<'_, T> {
    fn drop(&mut self) {
        self.pubsub.mark_closed(self.topic);
        debug!("subscription to topic {} ended", self.topic);
    }
}

#[async_trait]
impl<T> Closer for MemoryPubSub<T>
where
    T: Send + 'static,
{
    async fn close(&self, topic: &Topic) -> Result<(), PubSubError> {
        {
            let mut topics = self.topics();
            match topics.get_mut(topic) {
                Some(state @ TopicState::Subscribed(_)) => *state = TopicState::Closed,
                _ => return Err(PubSubError::TopicClosed(topic.clone())),
            }
        }
        self.notify();
        debug!("closed topic {}", topic);
        Ok(())
    }
}
