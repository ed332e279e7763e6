use super::*;
use crate::repo::MemoryRepo;
use crate::testing::spaced_trades;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracker::{SourceError, TradeRepo, TradeSource};

#[tokio::test]
async fn test_random_source_generates_requested_trades() {
    let base = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let mut source = RandomSource::new(50, base, vec![1, 2, 3]).with_seed(7);
    source.prepare().await.unwrap();

    let mut trades = Vec::new();
    while let Some(trade) = source.next().await.unwrap() {
        trades.push(trade);
    }

    assert_eq!(trades.len(), 50);
    assert_eq!(source.get_generated(), 50);
    let now = Utc::now();
    for trade in &trades {
        assert!([1, 2, 3].contains(&trade.get_instrument_id()));
        assert!((0..1000).contains(&trade.get_size()));
        assert!(trade.get_price() >= 0.0 && trade.get_price() < 1000.0);
        assert!(trade.get_timestamp() >= base && trade.get_timestamp() < now);
        assert_eq!(trade.get_id(), None);
    }
    let instruments: HashSet<i64> = trades.iter().map(|t| t.get_instrument_id()).collect();
    assert!(instruments.len() > 1);

    // Exhaustion is sticky.
    assert!(source.next().await.unwrap().is_none());
    assert!(source.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_random_source_seed_is_reproducible() {
    let base = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let mut first = RandomSource::new(5, base, vec![1, 2]).with_seed(42);
    let mut second = RandomSource::new(5, base, vec![1, 2]).with_seed(42);
    first.prepare().await.unwrap();
    second.prepare().await.unwrap();

    for _ in 0..5 {
        let a = first.next().await.unwrap().unwrap();
        let b = second.next().await.unwrap().unwrap();
        assert_eq!(a.get_instrument_id(), b.get_instrument_id());
        assert_eq!(a.get_size(), b.get_size());
        assert_eq!(a.get_price(), b.get_price());
    }
}

#[tokio::test]
async fn test_random_source_lifecycle_errors() {
    let base = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let mut source = RandomSource::new(1, base, vec![1]);
    assert!(matches!(source.next().await, Err(SourceError::NotPrepared)));
    source.prepare().await.unwrap();
    assert!(matches!(source.prepare().await, Err(SourceError::AlreadyPrepared)));

    let mut empty = RandomSource::new(1, base, Vec::new());
    assert!(matches!(empty.prepare().await, Err(SourceError::NoInstruments)));
}

#[tokio::test]
async fn test_repo_source_replays_in_order() {
    let repo = Arc::new(MemoryRepo::new());
    let start = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    // Stored newest first, replayed oldest first.
    for trade in spaced_trades(1, 10, start, 10, 4).into_iter().rev() {
        repo.create_trade(&trade).await.unwrap();
    }
    repo.create_trade(&spaced_trades(2, 10, start, 0, 1)[0]).await.unwrap();

    let mut source = RepoSource::new(repo.clone(), 1, start + chrono::Duration::seconds(10));
    assert!(matches!(source.next().await, Err(SourceError::NotPrepared)));
    source.prepare().await.unwrap();

    let mut offsets = Vec::new();
    while let Some(trade) = source.next().await.unwrap() {
        offsets.push((trade.get_timestamp() - start).num_seconds());
    }
    assert_eq!(offsets, vec![10, 20, 30]);
    assert!(source.next().await.unwrap().is_none());
    assert!(matches!(source.prepare().await, Err(SourceError::AlreadyPrepared)));
}

#[tokio::test]
async fn test_repo_source_prepare_fails_on_closed_repo() {
    let repo = Arc::new(MemoryRepo::new());
    repo.close();
    let mut source = RepoSource::new(repo, 1, Utc::now());
    assert!(matches!(source.prepare().await, Err(SourceError::Repo(_))));
}
