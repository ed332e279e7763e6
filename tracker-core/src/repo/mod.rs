//! Sinks for trades and positions.

mod memory;
mod sqlite;

pub use memory::MemoryRepo;
pub use sqlite::SqliteRepo;
