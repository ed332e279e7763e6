//! Defines the `TradeSource` trait for trade ingestion.
//!
//! A trade source presents a pull-based, lazy, finite and non-restartable sequence of
//! trades. It allows the pipeline to abstract over where trades come from (a synthetic
//! generator, a replay of stored trades, an external stream) while providing the same
//! contract to the feed task.

use crate::model::trade::Trade;
use crate::traits::repo::RepoError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// `next` was called before `prepare`.
    #[error("trade source not prepared")]
    NotPrepared,
    /// `prepare` was called a second time.
    #[error("trade source already prepared")]
    AlreadyPrepared,
    /// A synthetic source was given no instruments to draw from.
    #[error("no instruments to generate trades for")]
    NoInstruments,
    /// The backing repository failed while producing trades.
    #[error("read trades failed: {0}")]
    Repo(#[from] RepoError),
}

/// A trait for components that produce trades.
///
/// `prepare` must be called exactly once before the first `next`. Once `next` has
/// returned `Ok(None)` every subsequent call returns `Ok(None)` as well. Sources are
/// driven by a single task; `next` takes `&mut self` so it cannot be called
/// concurrently.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use tracker::model::trade::Trade;
/// use tracker::traits::trade_source::{SourceError, TradeSource};
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl TradeSource for EmptySource {
///     async fn prepare(&mut self) -> Result<(), SourceError> {
///         Ok(())
///     }
///
///     async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait TradeSource: Send {
    /// Performs the setup needed to start producing trades.
    async fn prepare(&mut self) -> Result<(), SourceError>;

    /// Returns the next trade, or `None` once the sequence is exhausted.
    async fn next(&mut self) -> Result<Option<Trade>, SourceError>;
}

#[async_trait]
impl<S> TradeSource for Box<S>
where
    S: TradeSource + ?Sized,
{
    async fn prepare(&mut self) -> Result<(), SourceError> {
        (**self).prepare().await
    }

    async fn next(&mut self) -> Result<Option<Trade>, SourceError> {
        (**self).next().await
    }
}
