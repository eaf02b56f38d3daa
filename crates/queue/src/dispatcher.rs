//! Job dispatcher: bounded-time publish with typed failures.
//!
//! Publishing is attempted once. Retrying, and rolling back the entities
//! that depend on the job, is the caller's decision.

use std::sync::Arc;
use std::time::Duration;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::job::StoryJobMessage;

use crate::error::QueueError;
use crate::publisher::JobPublisher;

/// Upper bound on a single publish.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct JobDispatcher {
    publisher: Arc<dyn JobPublisher>,
    timeout: Duration,
}

impl JobDispatcher {
    pub fn new(publisher: Arc<dyn JobPublisher>) -> Self {
        Self {
            publisher,
            timeout: PUBLISH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish `job`, mapping a misconfigured queue to `SVC3001` and every
    /// other failure (including the timeout) to `SVC3002`.
    pub async fn dispatch(&self, job: &StoryJobMessage) -> ServiceResult<()> {
        let result = match tokio::time::timeout(self.timeout, self.publisher.publish(job)).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout(self.timeout)),
        };

        result.map_err(|e| {
            tracing::error!(
                operation_id = %job.operation_id,
                error = %e,
                "Publish job failed",
            );
            classify(e)
        })
    }
}

fn classify(err: QueueError) -> ServiceError {
    match err {
        QueueError::Config(msg) => ServiceError::new(ErrorCode::QueueConfigInvalid, msg),
        other => ServiceError::wrap(ErrorCode::JobEnqueueFailed, "publish job", other),
    }
}
