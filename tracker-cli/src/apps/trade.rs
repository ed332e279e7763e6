use super::base_date;
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{InstrumentId, Trade, TradeRepo};
use tracker_core::comms::MemoryPubSub;
use tracker_core::pipeline::{run_pipeline, PipelineConfig};
use tracker_core::trade::{RandomSource, TradeProcessor};

/// Generates `num` random trades for `instrument_ids` and stores them.
pub async fn run<R>(
    repo: Arc<R>,
    num: usize,
    instrument_ids: Vec<InstrumentId>,
    cancel: &CancellationToken,
) -> anyhow::Result<()>
where
    R: TradeRepo + 'static,
{
    let pubsub = Arc::new(MemoryPubSub::<Trade>::new());
    let source = RandomSource::new(num, base_date(), instrument_ids);
    let processor = TradeProcessor::new(repo, pubsub.clone());

    run_pipeline(source, pubsub, &processor, &PipelineConfig::default(), cancel)
        .await
        .context("process trades failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::repo::MemoryRepo;

    #[tokio::test]
    async fn test_trades_are_generated_and_stored() {
        let repo = Arc::new(MemoryRepo::new());

        run(repo.clone(), 20, vec![5, 6], &CancellationToken::new())
            .await
            .unwrap();

        let trades = repo.trades();
        assert_eq!(trades.len(), 20);
        assert!(trades
            .iter()
            .all(|t| (t.get_instrument_id() == 5 || t.get_instrument_id() == 6)
                && t.get_timestamp() >= base_date()));
    }

    #[tokio::test]
    async fn test_no_instruments_fails() {
        let repo = Arc::new(MemoryRepo::new());
        let err = run(repo, 1, Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no instruments"));
    }
}
