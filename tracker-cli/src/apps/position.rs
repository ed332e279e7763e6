use anyhow::Context;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::{InstrumentId, Position, PositionRepo, Trade, TradeRepo};
use tracker_core::comms::MemoryPubSub;
use tracker_core::pipeline::{run_pipeline, PipelineConfig};
use tracker_core::position::{BinnedBuilder, BuilderConfig, PositionProcessor};
use tracker_core::trade::RepoSource;

/// Rebuilds the positions of `instrument_id` from the trades stored at or after `after`.
///
/// Positions previously built from `after` onwards are deleted first. The build starts
/// from the latest position before `after`, or from a flat position at `after`.
pub async fn run<R>(
    repo: Arc<R>,
    instrument_id: InstrumentId,
    after: DateTime<Utc>,
    bucket_width_secs: u64,
    cancel: &CancellationToken,
) -> anyhow::Result<()>
where
    R: TradeRepo + PositionRepo + 'static,
{
    let deleted = repo
        .delete_positions(instrument_id, after)
        .await
        .context("delete stale positions failed")?;
    if deleted > 0 {
        info!(
            "deleted stale positions instrument_id={} after={} count={}",
            instrument_id,
            after.to_rfc3339(),
            deleted
        );
    }

    let initial = match repo.read_position(instrument_id, after).await {
        Ok(position) => position,
        Err(err) if err.is_not_found() => Position::zero(instrument_id, after),
        Err(err) => return Err(err).context("read initial position failed"),
    };
    info!(
        "building positions instrument_id={} from size={} timestamp={}",
        instrument_id,
        initial.get_size(),
        initial.get_timestamp().to_rfc3339()
    );

    let pubsub = Arc::new(MemoryPubSub::<Trade>::new());
    let config = BuilderConfig::new(bucket_width_secs).with_initial_position(initial);
    let processor = PositionProcessor::new(
        repo.clone(),
        pubsub.clone(),
        Box::new(BinnedBuilder::new(config)),
    );
    let source = RepoSource::new(repo, instrument_id, after);

    run_pipeline(source, pubsub, &processor, &PipelineConfig::default(), cancel)
        .await
        .context("process positions failed")
}
