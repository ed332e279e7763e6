pub mod handoff;
pub mod message;
pub mod topic;
pub mod transport;
pub mod transports;

pub use handoff::{HandoffError, HandoffReceiver, HandoffSender};
pub use message::Message;
pub use topic::Topic;
pub use transport::{Closer, FnHandler, Handler, PubSubError, Publisher, PublisherSubscriber, Subscriber};
pub use transports::MemoryPubSub;
