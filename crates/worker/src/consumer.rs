//! The fetch / handle / commit loop.
//!
//! Every fetched message is committed once handling finishes, whether the
//! job succeeded or failed. A failed job is terminal; recovery is a new
//! request through the API. Only a crash before commit leads to
//! redelivery, which the persister absorbs idempotently.

use std::sync::Arc;
use std::time::Duration;

use s2v_queue::{Delivery, JobQueue, QueueError};
use tokio_util::sync::CancellationToken;

use crate::handler::JobHandler;
use crate::pool::WorkerPool;

/// Pause after a failed fetch before trying again.
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct ConsumerLoop {
    queue: Arc<dyn JobQueue>,
    handler: Arc<JobHandler>,
    pool: WorkerPool,
}

impl ConsumerLoop {
    pub fn new(queue: Arc<dyn JobQueue>, handler: Arc<JobHandler>, pool: WorkerPool) -> Self {
        Self {
            queue,
            handler,
            pool,
        }
    }

    /// Run until `cancel` fires or the queue closes.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker = %self.handler.worker_name(), "Consumer loop started");

        loop {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Consumer loop shutting down");
                    break;
                }
                fetched = self.queue.fetch() => fetched,
            };

            match fetched {
                Ok(Some(delivery)) => self.submit(delivery).await,
                Ok(None) => {}
                Err(QueueError::Closed) => {
                    tracing::info!("Queue closed, consumer loop exiting");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fetch failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(FETCH_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    /// Wait up to `timeout` for handlers still running.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.pool.drain(timeout).await
    }

    async fn submit(&self, delivery: Delivery) {
        let task = process(Arc::clone(&self.queue), Arc::clone(&self.handler), delivery);
        if let Err(task) = self.pool.try_spawn(task) {
            tracing::debug!("Worker pool saturated, processing inline");
            task.await;
        }
    }
}

async fn process(queue: Arc<dyn JobQueue>, handler: Arc<JobHandler>, delivery: Delivery) {
    if delivery.redelivered {
        handler.record_redelivery(&delivery.body).await;
    }

    if let Err(e) = handler.handle(&delivery.body).await {
        tracing::warn!(message_id = %delivery.id, error = %e, "Job finished with error");
    }

    if let Err(e) = queue.commit(&delivery).await {
        tracing::error!(message_id = %delivery.id, error = %e, "Commit failed");
    }
}
