//! Trade sources and the trade ingestion pipeline.

mod processor;
mod source;

#[cfg(test)]
mod tests;

pub use processor::TradeProcessor;
pub use source::{RandomSource, RepoSource};
