use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracker::{InstrumentId, Position, PositionRepo, RepoError, Trade, TradeRepo, TradeStream};

#[derive(Default)]
struct Records {
    trades: Vec<Trade>,
    positions: Vec<Position>,
    next_trade_id: i64,
    next_position_id: i64,
    closed: bool,
}

/// Keeps trades and positions in process memory.
///
/// Identifiers are assigned sequentially from 1. Mostly useful for tests and dry runs.
#[derive(Default)]
pub struct MemoryRepo {
    records: Mutex<Records>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Records>, RepoError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.closed {
            return Err(RepoError::Closed);
        }
        Ok(records)
    }

    /// Makes every subsequent operation fail with `RepoError::Closed`.
    pub fn close(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
    }

    /// Returns every stored trade, in insertion order.
    pub fn trades(&self) -> Vec<Trade> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).trades.clone()
    }

    /// Returns every stored position, in insertion order.
    pub fn positions(&self) -> Vec<Position> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .positions
            .clone()
    }
}

#[async_trait]
impl TradeRepo for MemoryRepo {
    async fn create_trade(&self, trade: &Trade) -> Result<i64, RepoError> {
        let mut records = self.records()?;
        records.next_trade_id += 1;
        let id = records.next_trade_id;
        records.trades.push(trade.clone().with_id(id));
        Ok(id)
    }

    async fn read_trades(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<TradeStream, RepoError> {
        let mut trades: Vec<Trade> = self
            .records()?
            .trades
            .iter()
            .filter(|t| t.get_instrument_id() == instrument_id && t.get_timestamp() >= after)
            .cloned()
            .collect();
        trades.sort_by_key(|t| (t.get_timestamp(), t.get_id()));
        Ok(stream::iter(trades.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl PositionRepo for MemoryRepo {
    async fn create_position(&self, position: &Position) -> Result<i64, RepoError> {
        let mut records = self.records()?;
        records.next_position_id += 1;
        let id = records.next_position_id;
        records.positions.push(position.clone().with_id(id));
        Ok(id)
    }

    async fn read_position(
        &self,
        instrument_id: InstrumentId,
        timestamp: DateTime<Utc>,
    ) -> Result<Position, RepoError> {
        self.records()?
            .positions
            .iter()
            .filter(|p| p.get_instrument_id() == instrument_id && p.get_timestamp() <= timestamp)
            .max_by_key(|p| (p.get_timestamp(), p.get_id()))
            .cloned()
            .ok_or(RepoError::NotFound {
                instrument_id,
                timestamp,
            })
    }

    async fn delete_positions(
        &self,
        instrument_id: InstrumentId,
        after: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let mut records = self.records()?;
        let before = records.positions.len();
        records
            .positions
            .retain(|p| p.get_instrument_id() != instrument_id || p.get_timestamp() < after);
        Ok((before - records.positions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use futures::TryStreamExt;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = MemoryRepo::new();
        assert_eq!(repo.create_trade(&Trade::new(1, 1, 1.0, at(0))).await, Ok(1));
        assert_eq!(repo.create_trade(&Trade::new(1, 1, 1.0, at(0))).await, Ok(2));
        assert_eq!(repo.create_position(&Position::zero(1, at(0))).await, Ok(1));
        assert_eq!(repo.trades()[1].get_id(), Some(2));
    }

    #[tokio::test]
    async fn test_read_trades_filters_and_sorts() {
        let repo = MemoryRepo::new();
        for (instrument_id, secs) in [(1, 5), (2, 1), (1, 1), (1, -3), (1, 1)] {
            repo.create_trade(&Trade::new(instrument_id, secs, 1.0, at(secs))).await.unwrap();
        }

        let trades: Vec<Trade> = repo.read_trades(1, at(1)).await.unwrap().try_collect().await.unwrap();

        let ids: Vec<Option<i64>> = trades.iter().map(|t| t.get_id()).collect();
        assert_eq!(ids, vec![Some(3), Some(5), Some(1)]);
    }

    #[tokio::test]
    async fn test_positions_read_and_delete() {
        let repo = MemoryRepo::new();
        repo.create_position(&Position::new(1, 1, at(0))).await.unwrap();
        repo.create_position(&Position::new(1, 2, at(10))).await.unwrap();
        repo.create_position(&Position::new(1, 3, at(10))).await.unwrap();

        assert_eq!(repo.read_position(1, at(10)).await.unwrap().get_size(), 3);
        assert!(repo.read_position(1, at(-1)).await.unwrap_err().is_not_found());
        assert!(repo.read_position(2, at(10)).await.unwrap_err().is_not_found());

        assert_eq!(repo.delete_positions(1, at(10)).await, Ok(2));
        assert_eq!(repo.read_position(1, at(10)).await.unwrap().get_size(), 1);
    }

    #[tokio::test]
    async fn test_closed_repo_fails() {
        let repo = MemoryRepo::new();
        repo.close();
        assert_eq!(
            repo.create_position(&Position::zero(1, at(0))).await,
            Err(RepoError::Closed)
        );
        assert!(repo.read_trades(1, at(0)).await.is_err());
    }
}
