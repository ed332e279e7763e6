//! Position building.
//!
//! Ordered trades of a single instrument are folded into position snapshots under a
//! fixed-width bucketing policy ([`PositionFold`]), driven asynchronously by a
//! [`PositionBuilder`] and persisted by the [`PositionProcessor`].

mod builder;
mod errors;
mod fold;
mod processor;


pub use builder::{BinnedBuilder, BuilderConfig, PositionBuilder, DEFAULT_BUCKET_WIDTH_SECS};
pub use errors::BuildError;
pub use fold::PositionFold;
pub use processor::PositionProcessor;
