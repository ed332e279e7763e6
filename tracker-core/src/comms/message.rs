use crate::comms::topic::Topic;

/// A transport envelope: the topic a payload travels on and the payload itself.
///
/// The payload type is fixed per transport instance, so a subscriber can never be
/// handed a value of an unexpected kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<T> {
    topic: Topic,
    payload: T,
}

impl<T> Message<T> {
    pub fn new(topic: Topic, payload: T) -> Self {
        Self { topic, payload }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}
