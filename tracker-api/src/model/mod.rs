//! Data models shared by every tracker component.
//!
//! # Submodules
//! - [`instrument`]: Instrument identifiers.
//! - [`trade`]: Immutable trade events.
//! - [`position`]: Point-in-time position snapshots.

pub mod instrument;
pub mod position;
pub mod trade;

pub use instrument::InstrumentId;
pub use position::Position;
pub use trade::Trade;
