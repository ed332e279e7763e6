//! SQLite backed repository.
//!
//! Timestamps are stored as unix seconds. Every query runs on the blocking thread pool
//! while holding the connection lock for the duration of that single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracker::{InstrumentId, Position, PositionRepo, RepoError, Trade, TradeRepo, TradeStream};

const SCHEMA: &str = include_str!("query/schema.sql");
const CREATE_TRADE: &str = include_str!("query/create_trade.sql");
const CREATE_POSITION: &str = include_str!("query/create_position.sql");
const READ_TRADES: &str = include_str!("query/read_trades.sql");
const READ_POSITION: &str = include_str!("query/read_position.sql");
const DELETE_POSITIONS: &str = include_str!("query/delete_positions.sql");

/// Number of trades fetched per round trip by `read_trades`.
const TRADE_BATCH_SIZE: i64 = 256;

/// Stores trades and positions in a SQLite database.
#[derive(Clone)]
pub struct SqliteRepo {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepo {
    /// Opens (or creates) the database at `path` and makes sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RepoError::Database(format!(
                    "failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(database)?;
        let repo = Self::from_connection(conn)?;
        info!("opened trade database at {}", path.display());
        Ok(repo)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, RepoError> {
        Self::from_connection(Connection::open_in_memory().map_err(database)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RepoError> {
        conn.execute_batch(SCHEMA).map_err(database)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_connection<F, R>(&self, f: F) -> Result<R, RepoError>
    where
        F: FnOnce(&Connection) -> Result<R, RepoError> + Send + 'static,
        R: Send + 'static,
    {
        with_connection(self.conn.clone(), f).await
    }
}

async fn with_connection<F, R>(conn: Arc<Mutex<Connection>>, f: F) -> Result<R, RepoError>
where
    F: FnOnce(&Connection) -> Result<R, RepoError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    })
    .await
    .map_err(|e| RepoError::Database(format!("database task failed: {}", e)))?
}

fn database(err: rusqlite::Error) -> RepoError {
    RepoError::Database(err.to_string())
}

fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>, RepoError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| RepoError::Database(format!("invalid stored timestamp {}", secs)))
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, InstrumentId, i64, f64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, InstrumentId, i64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Reads the next page of trades following the `(timestamp, id)` cursor.
fn read_trade_batch(
    conn: &Connection,
    instrument_id: InstrumentId,
    cursor: (i64, i64),
) -> Result<VecDeque<Trade>, RepoError> {
    let mut statement = conn.prepare_cached(READ_TRADES).map_err(database)?;
    let rows = statement
        .query_map(
            params![instrument_id, cursor.0, cursor.1, TRADE_BATCH_SIZE],
            trade_from_row,
        )
        .map_err(database)?;

    let mut trades = VecDeque::new();
    for row in rows {
        let (id, instrument_id, size, price, secs) = row.map_err(database)?;
        let timestamp = from_unix_seconds(secs)?;
        trades.push_back(Trade::new(instrument_id, size, price, timestamp).with_id(id));
    }
    Ok(trades)
}

struct TradeCursor {
    conn: Arc<Mutex<Connection>>,
    instrument_id: InstrumentId,
    // (timestamp, id) of the last trade handed out.
    position: (i64, i64),
    buffered: VecDeque<Trade>,
    done: bool,
}

impl TradeCursor {
    async fn next_trade(mut self) -> Option<(Result<Trade, RepoError>, Self)> {
        if self.buffered.is_empty() && !self.done {
            let conn = self.conn.clone();
            let instrument_id = self.instrument_id;
            let position = self.position;
            match with_connection(conn, move |c| read_trade_batch(c, instrument_id, position)).await {
                Ok(batch) => {
                    self.done = (batch.len() as i64) < TRADE_BATCH_SIZE;
                    self.buffered = batch;
                }
                Err(err) => {
                    self.done = true;
                    return Some((Err(err), self));
                }
            }
        }
        let trade = self.buffered.pop_front()?;
        self.position = (trade.get_unix_seconds(), trade.get_id().unwrap_or_default());
        Some((Ok(trade), self))
    }
}

#[async_trait]
impl TradeRepo for SqliteRepo {
    async fn create_trade(&self, trade: &Trade) -> Result<i64, RepoError> {
        let trade = trade.clone();
        self.with_connection(move |conn| {
            conn.prepare_cached(CREATE_TRADE)
                .and_then(|mut statement| {
                    statement.query_row(
                        params![
                            trade.get_instrument_id(),
                            trade.get_size(),
                            trade.get_price(),
                            trade.get_unix_seconds()
                        ],
                        |row| row.get(0),
                    )
                })
                .map_err(database)
        })
        .await
    }

    async fn read_trades(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<TradeStream, RepoError> {
        debug!(
            "reading trades instrument_id={} after={}",
            instrument_id,
            after.to_rfc3339()
        );
        let cursor = TradeCursor {
            conn: self.conn.clone(),
            instrument_id,
            // Every id is positive, so this cursor admits trades at exactly `after`.
            position: (after.timestamp(), 0),
            buffered: VecDeque::new(),
            done: false,
        };
        Ok(stream::unfold(cursor, TradeCursor::next_trade).boxed())
    }
}

#[async_trait]
impl PositionRepo for SqliteRepo {
    async fn create_position(&self, position: &Position) -> Result<i64, RepoError> {
        let position = position.clone();
        self.with_connection(move |conn| {
            conn.prepare_cached(CREATE_POSITION)
                .and_then(|mut statement| {
                    statement.query_row(
                        params![
                            position.get_instrument_id(),
                            position.get_size(),
                            position.get_unix_seconds()
                        ],
                        |row| row.get(0),
                    )
                })
                .map_err(database)
        })
        .await
    }

    async fn read_position(
        &self,
        instrument_id: InstrumentId,
        timestamp: DateTime<Utc>,
    ) -> Result<Position, RepoError> {
        let row = self
            .with_connection(move |conn| {
                conn.prepare_cached(READ_POSITION)
                    .and_then(|mut statement| {
                        statement
                            .query_row(params![instrument_id, timestamp.timestamp()], position_from_row)
                            .optional()
                    })
                    .map_err(database)
            })
            .await?;

        let (id, instrument_id, size, secs) = row.ok_or(RepoError::NotFound {
            instrument_id,
            timestamp,
        })?;
        Ok(Position::new(instrument_id, size, from_unix_seconds(secs)?).with_id(id))
    }

    async fn delete_positions(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        self.with_connection(move |conn| {
            conn.execute(DELETE_POSITIONS, params![instrument_id, after.timestamp()])
                .map(|deleted| deleted as u64)
                .map_err(database)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use futures::TryStreamExt;
    use tempfile::TempDir;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        base() + Duration::seconds(secs)
    }

    #[tokio::test]
    async fn test_create_and_read_trades() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        // Inserted out of order on purpose.
        for (instrument_id, size, secs) in [(1, 10, 30), (1, 20, 10), (2, 5, 20), (1, 30, 20), (1, 40, 0)] {
            repo.create_trade(&Trade::new(instrument_id, size, 1.5, at(secs)))
                .await
                .unwrap();
        }

        let trades: Vec<Trade> = repo
            .read_trades(1, at(10))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let sizes: Vec<i64> = trades.iter().map(|t| t.get_size()).collect();
        assert_eq!(sizes, vec![20, 30, 10]);
        assert!(trades.iter().all(|t| t.get_instrument_id() == 1));
        assert_eq!(trades[0].get_timestamp(), at(10));
        assert_eq!(trades[0].get_price(), 1.5);
        assert_eq!(trades[0].get_id(), Some(2));
    }

    #[tokio::test]
    async fn test_read_trades_spans_batches() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        let total = TRADE_BATCH_SIZE * 2 + 7;
        for i in 0..total {
            // Pairs of trades share a timestamp so the cursor must break ties on id.
            repo.create_trade(&Trade::new(1, i, 1.0, at(i / 2))).await.unwrap();
        }

        let trades: Vec<Trade> = repo.read_trades(1, base()).await.unwrap().try_collect().await.unwrap();

        let sizes: Vec<i64> = trades.iter().map(|t| t.get_size()).collect();
        assert_eq!(sizes, (0..total).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_read_trades_interleaved_with_writes() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        for i in 0..TRADE_BATCH_SIZE + 1 {
            repo.create_trade(&Trade::new(1, 1, 1.0, at(i))).await.unwrap();
        }

        let mut trades = repo.read_trades(1, base()).await.unwrap();
        let mut read = 0;
        while let Some(trade) = trades.try_next().await.unwrap() {
            repo.create_position(&Position::new(1, read, trade.get_timestamp()))
                .await
                .unwrap();
            read += 1;
        }
        assert_eq!(read, TRADE_BATCH_SIZE + 1);
    }

    #[tokio::test]
    async fn test_read_position_latest_at_or_before() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        repo.create_position(&Position::new(1, 10, at(0))).await.unwrap();
        repo.create_position(&Position::new(1, 20, at(10))).await.unwrap();
        let tie = repo.create_position(&Position::new(1, 25, at(10))).await.unwrap();
        repo.create_position(&Position::new(1, 30, at(20))).await.unwrap();
        repo.create_position(&Position::new(2, 99, at(5))).await.unwrap();

        let position = repo.read_position(1, at(15)).await.unwrap();
        assert_eq!(position, Position::new(1, 25, at(10)).with_id(tie));

        let exact = repo.read_position(1, at(20)).await.unwrap();
        assert_eq!(exact.get_size(), 30);

        let err = repo.read_position(1, at(-1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_positions_from_timestamp() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        for secs in [0, 10, 20, 30] {
            repo.create_position(&Position::new(1, secs, at(secs))).await.unwrap();
        }
        repo.create_position(&Position::new(2, 1, at(30))).await.unwrap();

        assert_eq!(repo.delete_positions(1, at(10)).await.unwrap(), 3);
        assert_eq!(repo.read_position(1, at(100)).await.unwrap().get_size(), 0);
        assert_eq!(repo.read_position(2, at(100)).await.unwrap().get_size(), 1);
    }

    #[tokio::test]
    async fn test_open_file_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tracker.db");

        let repo = SqliteRepo::open(&path).unwrap();
        let id = repo.create_trade(&Trade::new(3, 7, 2.25, at(1))).await.unwrap();
        drop(repo);

        let reopened = SqliteRepo::open(&path).unwrap();
        let trades: Vec<Trade> = reopened.read_trades(3, base()).await.unwrap().try_collect().await.unwrap();
        assert_eq!(trades, vec![Trade::new(3, 7, 2.25, at(1)).with_id(id)]);
    }
}
