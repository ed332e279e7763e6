use anyhow::Context;
use chrono::{DateTime, Utc};
use log::info;
use tracker::{InstrumentId, Position, PositionRepo};

/// Reads the position of `instrument_id` at or before `at` and logs it.
pub async fn run<R>(repo: &R, instrument_id: InstrumentId, at: DateTime<Utc>) -> anyhow::Result<Position>
where
    R: PositionRepo + ?Sized,
{
    let position = repo
        .read_position(instrument_id, at)
        .await
        .context("read position failed")?;
    info!(
        "position found instrument_id={} size={} timestamp={}",
        position.get_instrument_id(),
        position.get_size(),
        position.get_timestamp().to_rfc3339()
    );
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tracker_core::repo::MemoryRepo;

    #[tokio::test]
    async fn test_query_returns_latest_position() {
        let repo = MemoryRepo::new();
        let t0 = Utc.with_ymd_and_hms(2010, 10, 10, 10, 10, 10).unwrap();
        repo.create_position(&Position::new(4, 1, t0)).await.unwrap();
        repo.create_position(&Position::new(4, 2, t0 + Duration::seconds(5))).await.unwrap();

        let position = run(&repo, 4, t0 + Duration::seconds(4)).await.unwrap();
        assert_eq!(position.get_size(), 1);
        let position = run(&repo, 4, Utc::now()).await.unwrap();
        assert_eq!(position.get_size(), 2);
    }

    #[tokio::test]
    async fn test_query_without_position_fails() {
        let repo = MemoryRepo::new();
        let err = run(&repo, 4, Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("read position failed"));
    }
}
