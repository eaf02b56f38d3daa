use std::time::Duration;

/// Errors from queue publishing and consumption.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue is not configured (missing URL, stream or group).
    #[error("queue configuration invalid: {0}")]
    Config(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The in-memory queue has been closed.
    #[error("queue closed")]
    Closed,
}
