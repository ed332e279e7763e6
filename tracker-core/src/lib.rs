//! # Tracker Core Library
//!
//! Streaming aggregation of trade events into positions.
//!
//! ## Modules
//! - `comms`: Rendezvous handoff channel and the typed in-memory pub/sub transport.
//! - `position`: Bucketing fold, position builder and the position processor.
//! - `trade`: Synthetic and replay trade sources, and the trade processor.
//! - `repo`: In-memory and SQLite sinks.
//! - `pipeline`: Feed task and orchestration of a whole run.
//! - `args`: Standardized argument parsing.
//! - `logging`: Logger initialisation.

pub mod args;
pub mod comms;
pub mod logging;
pub mod pipeline;
pub mod position;
pub mod repo;
pub mod trade;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
