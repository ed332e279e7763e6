use crate::comms::transport::PubSubError;
use crate::position::BuildError;
use thiserror::Error;
use tracker::{RepoError, SourceError};

/// Failure of a pipeline run, tagged with the stage it came from.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("prepare source failed: {0}")]
    Prepare(#[source] SourceError),
    #[error("read trade failed: {0}")]
    Source(#[source] SourceError),
    #[error("publish failed: {0}")]
    Publish(#[source] PubSubError),
    #[error("close topic failed: {0}")]
    Close(#[source] PubSubError),
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] PubSubError),
    #[error("build positions failed: {0}")]
    Build(#[source] BuildError),
    #[error("persist failed: {0}")]
    Persist(#[source] RepoError),
    #[error("feed task panicked: {0}")]
    FeedPanicked(String),
    #[error("context cancelled")]
    Cancelled,
}

impl PipelineError {
    /// True when the error only reports that the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Cancelled => true,
            PipelineError::Publish(err) | PipelineError::Close(err) | PipelineError::Subscribe(err) => {
                err.is_cancelled()
            }
            PipelineError::Build(err) => err.is_cancelled(),
            _ => false,
        }
    }
}
