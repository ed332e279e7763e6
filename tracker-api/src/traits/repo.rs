//! Persistence contracts consumed by the pipelines.
//!
//! Trades and positions are stored by an external sink. The pipelines only see the
//! narrow create/read/delete surface defined here, so the storage backend (in-memory,
//! SQLite, a remote database) can be swapped without touching the core.

use crate::model::instrument::InstrumentId;
use crate::model::position::Position;
use crate::model::trade::Trade;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepoError {
    #[error("no position for instrument {instrument_id} at or before {timestamp}")]
    NotFound {
        instrument_id: InstrumentId,
        timestamp: DateTime<Utc>,
    },
    #[error("database error: {0}")]
    Database(String),
    #[error("repository closed")]
    Closed,
}

/// Lazy sequence of stored trades, in ascending timestamp order.
pub type TradeStream = BoxStream<'static, Result<Trade, RepoError>>;

/// CRUD operations on trade records.
#[async_trait]
pub trait TradeRepo: Send + Sync {
    /// Stores a trade and returns the identifier assigned to it.
    async fn create_trade(&self, trade: &Trade) -> Result<i64, RepoError>;

    /// Streams the trades of `instrument_id` with a timestamp at or after `after`,
    /// ordered by ascending timestamp.
    async fn read_trades(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<TradeStream, RepoError>;
}

/// CRUD operations on position records.
#[async_trait]
pub trait PositionRepo: Send + Sync {
    /// Stores a position snapshot and returns the identifier assigned to it.
    async fn create_position(&self, position: &Position) -> Result<i64, RepoError>;

    /// Reads the latest position of `instrument_id` with a timestamp at or before
    /// `timestamp`.
    ///
    /// # Returns
    ///
    /// * `Err(RepoError::NotFound)` if no such snapshot exists.
    async fn read_position(
        &self,
        instrument_id: InstrumentId,
        timestamp: DateTime<Utc>,
    ) -> Result<Position, RepoError>;

    /// Deletes every position of `instrument_id` from `after` onwards and returns the
    /// number of snapshots removed.
    async fn delete_positions(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<u64, RepoError>;
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}
