//! Remote collaborator traits

use async_trait::async_trait;
use daimon_core::{BatchRequest, BatchResponse, QuickCheckResponse};

/// Result type for remote calls
pub type SinkResult<T> = Result<T, SinkError>;

/// Every way a remote call can fail. Callers resolve all of these to their
/// safe default (silence or drop).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("timed out")]
    Timeout,

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Receives flushed heartbeat batches.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn deliver_batch(&self, batch: &BatchRequest) -> SinkResult<BatchResponse>;
}

/// Answers the interactive quick-check on the emergence path.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn quick_check(&self, prompt: &str) -> SinkResult<QuickCheckResponse>;
}
