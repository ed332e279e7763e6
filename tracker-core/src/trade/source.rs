use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracker::{InstrumentId, SourceError, Trade, TradeRepo, TradeSource, TradeStream};

/// Generates a fixed number of random trades.
///
/// Instruments are drawn uniformly from the configured set and timestamps uniformly
/// from `[base_date, now)`. Successive trades are not sorted by timestamp, so this
/// source is only suitable for ingestion, never as input of a position build.
pub struct RandomSource {
    total: usize,
    generated: usize,
    base_date: DateTime<Utc>,
    instrument_ids: Vec<InstrumentId>,
    seed: Option<u64>,
    rng: Option<StdRng>,
}

impl RandomSource {
    /// Creates a new RandomSource.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of trades to generate.
    /// * `base_date` - Earliest timestamp a trade may carry.
    /// * `instrument_ids` - Instruments the trades are drawn for.
    pub fn new(total: usize, base_date: DateTime<Utc>, instrument_ids: Vec<InstrumentId>) -> Self {
        Self {
            total,
            generated: 0,
            base_date,
            instrument_ids,
            seed: None,
            rng: None,
        }
    }

    /// Makes the generated sequence reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns how many trades have been generated so far.
    pub fn get_generated(&self) -> usize {
        self.generated
    }

    fn random_trade(&self, rng: &mut StdRng) -> Trade {
        let instrument_id = self.instrument_ids[rng.gen_range(0..self.instrument_ids.len())];
        let scale = rng.gen_range(0..1000) as f64;
        let price = (rng.gen::<f64>() * scale * 100.0).round() / 100.0;
        let size = rng.gen_range(0..1000);

        let from = self.base_date.timestamp();
        let until = Utc::now().timestamp();
        let secs = if until > from { rng.gen_range(from..until) } else { from };
        let timestamp = Utc.timestamp_opt(secs, 0).single().unwrap_or(self.base_date);

        Trade::new(instrument_id, size, price, timestamp)
    }
}

#[async_trait]
impl TradeSource for RandomSource {
    async fn prepare(&mut self) -> Result<(), SourceError> {
        if self.rng.is_some() {
            return Err(SourceError::AlreadyPrepared);
        }
        if self.instrument_ids.is_empty() {
            return Err(SourceError::NoInstruments);
        }
        self.rng = Some(match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
        let mut rng = self.rng.take().ok_or(SourceError::NotPrepared)?;
        let trade = if self.generated < self.total {
            self.generated += 1;
            Some(self.random_trade(&mut rng))
        } else {
            None
        };
        self.rng = Some(rng);
        Ok(trade)
    }
}

enum ReplayState {
    Idle,
    Streaming(TradeStream),
    Exhausted,
}

/// Replays the stored trades of one instrument, oldest first.
pub struct RepoSource {
    repo: Arc<dyn TradeRepo>,
    instrument_id: InstrumentId,
    after: DateTime<Utc>,
    state: ReplayState,
}

impl RepoSource {
    /// Creates a new RepoSource reading the trades of `instrument_id` with a timestamp
    /// at or after `after`.
    pub fn new(repo: Arc<dyn TradeRepo>, instrument_id: InstrumentId, after: DateTime<Utc>) -> Self {
        Self {
            repo,
            instrument_id,
            after,
            state: ReplayState::Idle,
        }
    }
}

#[async_trait]
impl TradeSource for RepoSource {
    async fn prepare(&mut self) -> Result<(), SourceError> {
        if !matches!(self.state, ReplayState::Idle) {
            return Err(SourceError::AlreadyPrepared);
        }
        let trades = self.repo.read_trades(self.instrument_id, self.after).await?;
        self.state = ReplayState::Streaming(trades);
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
        let trades = match &mut self.state {
            ReplayState::Idle => return Err(SourceError::NotPrepared),
            ReplayState::Exhausted => return Ok(None),
            ReplayState::Streaming(trades) => trades,
        };
        let next = trades.next().await;
        match next {
            Some(Ok(trade)) => Ok(Some(trade)),
            Some(Err(err)) => {
                self.state = ReplayState::Exhausted;
                Err(err.into())
            }
            None => {
                self.state = ReplayState::Exhausted;
                Ok(None)
            }
        }
    }
}
