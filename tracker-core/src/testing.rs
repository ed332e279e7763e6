//! Deterministic trade sources for tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracker::{InstrumentId, RepoError, SourceError, Trade, TradeSource};

/// Builds `count` trades of `size` for one instrument, `spacing_secs` apart.
pub fn spaced_trades(
    instrument_id: InstrumentId,
    size: i64,
    start: DateTime<Utc>,
    spacing_secs: i64,
    count: usize,
) -> Vec<Trade> {
    (0..count as i64)
        .map(|i| Trade::new(instrument_id, size, 100.0, start + Duration::seconds(i * spacing_secs)))
        .collect()
}

/// Replays a fixed list of trades, optionally failing part way through.
pub struct ScriptedSource {
    trades: VecDeque<Trade>,
    fail_at: Option<usize>,
    served: usize,
    prepared: bool,
}

impl ScriptedSource {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades: trades.into(),
            fail_at: None,
            served: 0,
            prepared: false,
        }
    }

    /// Fails instead of producing the trade at index `index`.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

#[async_trait]
impl TradeSource for ScriptedSource {
    async fn prepare(&mut self) -> Result<(), SourceError> {
        if self.prepared {
            return Err(SourceError::AlreadyPrepared);
        }
        self.prepared = true;
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
        if !self.prepared {
            return Err(SourceError::NotPrepared);
        }
        if self.fail_at == Some(self.served) {
            self.fail_at = None;
            return Err(SourceError::Repo(RepoError::Database("scripted failure".to_string())));
        }
        let trade = self.trades.pop_front();
        if trade.is_some() {
            self.served += 1;
        }
        Ok(trade)
    }
}

/// Produces sorted trades of size 1 for one instrument forever.
pub struct EndlessSource {
    instrument_id: InstrumentId,
    next_timestamp: DateTime<Utc>,
    step_secs: i64,
}

impl EndlessSource {
    pub fn new(instrument_id: InstrumentId, start: DateTime<Utc>, step_secs: i64) -> Self {
        Self {
            instrument_id,
            next_timestamp: start,
            step_secs,
        }
    }
}

#[async_trait]
impl TradeSource for EndlessSource {
    async fn prepare(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
        tokio::task::yield_now().await;
        let trade = Trade::new(self.instrument_id, 1, 100.0, self.next_timestamp);
        self.next_timestamp += Duration::seconds(self.step_secs);
        Ok(Some(trade))
    }
}
