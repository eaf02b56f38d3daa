//! Publishing capability and its variants.
//!
//! The variant is chosen once at startup by [`connect_publisher`]:
//! a configured queue gets [`RedisStreamPublisher`], an explicitly disabled
//! one gets [`NoopPublisher`], and a missing configuration gets
//! [`FailingPublisher`] so every enqueue reports the misconfiguration.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use s2v_core::job::StoryJobMessage;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::{KEY_FIELD, PAYLOAD_FIELD};

#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, job: &StoryJobMessage) -> Result<(), QueueError>;
}

/// Appends job descriptors to a Redis stream with `XADD`.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    redis: ConnectionManager,
    stream: String,
}

impl RedisStreamPublisher {
    pub async fn connect(redis_url: &str, stream: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::Config(format!("invalid queue url: {e}")))?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(redis, stream))
    }

    pub fn from_connection(redis: ConnectionManager, stream: &str) -> Self {
        Self {
            redis,
            stream: stream.to_string(),
        }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.redis.clone()
    }
}

#[async_trait]
impl JobPublisher for RedisStreamPublisher {
    async fn publish(&self, job: &StoryJobMessage) -> Result<(), QueueError> {
        let body = job.encode()?;
        let mut conn = self.redis.clone();
        let entry_id: String = conn
            .xadd(
                &self.stream,
                "*",
                &[
                    (KEY_FIELD, job.operation_id.as_bytes()),
                    (PAYLOAD_FIELD, body.as_slice()),
                ],
            )
            .await?;
        tracing::debug!(
            operation_id = %job.operation_id,
            entry_id = %entry_id,
            stream = %self.stream,
            "Job published",
        );
        Ok(())
    }
}

/// Accepts every job without sending it anywhere.
#[derive(Debug, Default, Clone)]
pub struct NoopPublisher;

#[async_trait]
impl JobPublisher for NoopPublisher {
    async fn publish(&self, job: &StoryJobMessage) -> Result<(), QueueError> {
        tracing::warn!(
            operation_id = %job.operation_id,
            "Queue publishing disabled, job dropped",
        );
        Ok(())
    }
}

/// Rejects every job with the configuration error it was built with.
#[derive(Debug, Clone)]
pub struct FailingPublisher {
    reason: String,
}

impl FailingPublisher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl JobPublisher for FailingPublisher {
    async fn publish(&self, _job: &StoryJobMessage) -> Result<(), QueueError> {
        Err(QueueError::Config(self.reason.clone()))
    }
}

/// Create the stream and consumer group if missing. An existing group is
/// not an error.
pub async fn ensure_stream_group(
    redis: &ConnectionManager,
    stream: &str,
    group: &str,
) -> Result<(), QueueError> {
    let mut conn = redis.clone();
    let created: Result<(), redis::RedisError> =
        conn.xgroup_create_mkstream(stream, group, "0").await;
    match created {
        Ok(()) => {
            tracing::info!(stream, group, "Created queue stream group");
            Ok(())
        }
        Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Select the publisher variant for `config`.
///
/// Only a Redis connection failure is returned as an error; missing
/// configuration yields a [`FailingPublisher`].
pub async fn connect_publisher(config: &QueueConfig) -> Result<Arc<dyn JobPublisher>, QueueError> {
    if config.publish_disabled {
        tracing::warn!("Queue publishing disabled by configuration");
        return Ok(Arc::new(NoopPublisher));
    }

    let url = match config.require_url() {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Queue configuration invalid, enqueue will fail");
            return Ok(Arc::new(FailingPublisher::new(e.to_string())));
        }
    };

    let publisher = RedisStreamPublisher::connect(url, &config.stream).await?;
    if config.auto_create {
        if let Err(e) = ensure_stream_group(&publisher.connection(), &config.stream, &config.group).await {
            tracing::warn!(error = %e, stream = %config.stream, "Ensure queue stream failed");
        }
    }
    tracing::info!(stream = %config.stream, "Queue publisher connected");
    Ok(Arc::new(publisher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn job() -> StoryJobMessage {
        StoryJobMessage::render_video(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "t",
            "movie",
            chrono::Utc::now(),
        )
    }

    fn config() -> QueueConfig {
        QueueConfig {
            url: None,
            stream: "story-jobs".into(),
            group: "story-worker".into(),
            auto_create: false,
            publish_disabled: false,
            block_ms: 10,
        }
    }

    #[tokio::test]
    async fn missing_url_selects_failing_publisher() {
        let publisher = connect_publisher(&config()).await.unwrap();
        let err = publisher.publish(&job()).await.unwrap_err();
        assert_matches!(err, QueueError::Config(_));
    }

    #[tokio::test]
    async fn disabled_publishing_accepts_jobs() {
        let mut cfg = config();
        cfg.publish_disabled = true;
        let publisher = connect_publisher(&cfg).await.unwrap();
        publisher.publish(&job()).await.unwrap();
    }
}
