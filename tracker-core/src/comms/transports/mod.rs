pub mod memory;

pub use memory::MemoryPubSub;
