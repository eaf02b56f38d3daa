//! Per-message job processing.
//!
//! Decode, mark running, run the action, then record the outcome on the
//! operation. Failures also mark the affected shot (regenerate) or story
//! (everything else) as failed so nothing stays stuck in a working state.
//! Messages for operations that already finished are acknowledged untouched.

use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::job::{salvage_operation_id, JobAction, StoryJobMessage};
use s2v_core::types::EntityId;
use s2v_db::models::status::{ShotStatus, StoryStatus};
use s2v_db::{Datastore, OperationStore};
use s2v_model::{
    CreateStoryboardRequest, ModelError, ModelService, RegenerateShotRequest, RenderVideoRequest,
    RpcCode,
};

use crate::persister::{ResultPersister, StoryScope};
use crate::storage::ObjectStorage;

pub struct JobHandler {
    store: Arc<dyn Datastore>,
    operations: OperationStore,
    persister: ResultPersister,
    model: Arc<dyn ModelService>,
    worker_name: String,
}

impl JobHandler {
    pub fn new(
        store: Arc<dyn Datastore>,
        model: Arc<dyn ModelService>,
        storage: Arc<dyn ObjectStorage>,
        worker_name: impl Into<String>,
    ) -> Self {
        Self {
            operations: OperationStore::new(Arc::clone(&store)),
            persister: ResultPersister::new(Arc::clone(&store), storage),
            store,
            model,
            worker_name: worker_name.into(),
        }
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Process one message body. The returned error has already been
    /// recorded on the operation when its id was readable.
    pub async fn handle(&self, body: &[u8]) -> ServiceResult<()> {
        let job = match StoryJobMessage::decode(body) {
            Ok(job) => job,
            Err(err) => {
                if let Some(operation_id) = salvage_operation_id(body) {
                    self.record_failure(operation_id, &err).await;
                }
                return Err(err);
            }
        };

        let operation_id = job.operation_uuid()?;

        if self.already_finished(operation_id).await {
            return Ok(());
        }

        if let Err(e) = self.operations.mark_running(operation_id).await {
            tracing::warn!(operation_id = %operation_id, error = %e, "Mark running failed, continuing");
        }

        match self.execute(&job).await {
            Ok(()) => {
                if let Err(e) = self
                    .operations
                    .mark_succeeded(operation_id, &self.worker_name)
                    .await
                {
                    tracing::warn!(operation_id = %operation_id, error = %e, "Mark succeeded failed");
                }
                tracing::info!(operation_id = %operation_id, story_id = %job.story_id, "Job succeeded");
                Ok(())
            }
            Err(err) => {
                self.record_failure(operation_id, &err).await;
                self.mark_entity_failed(&job).await;
                Err(err)
            }
        }
    }

    /// Bump the retry counter of a message seen before.
    pub async fn record_redelivery(&self, body: &[u8]) {
        let Some(operation_id) = salvage_operation_id(body) else {
            return;
        };
        tracing::info!(operation_id = %operation_id, "Redelivered job");
        if let Err(e) = self.operations.increment_retry(operation_id).await {
            tracing::warn!(operation_id = %operation_id, error = %e, "Increment retry failed");
        }
    }

    // ---- private helpers ----

    /// True when the operation already reached a terminal state, so a
    /// redelivered message is committed without running the action again.
    /// Lookup errors fall through to normal processing.
    async fn already_finished(&self, operation_id: EntityId) -> bool {
        match self.store.find_operation(operation_id).await {
            Ok(Some(op)) if op.status.is_terminal() => {
                tracing::info!(
                    operation_id = %operation_id,
                    status = %op.status,
                    "Operation already finished, skipping"
                );
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(operation_id = %operation_id, error = %e, "Operation lookup failed, continuing");
                false
            }
        }
    }

    async fn execute(&self, job: &StoryJobMessage) -> ServiceResult<()> {
        let action = job.action()?;
        let scope = StoryScope {
            story_id: job.story_uuid()?,
            user_id: job.user_uuid()?,
        };
        let payload = &job.payload;

        match action {
            JobAction::CreateStoryboard => {
                let request = CreateStoryboardRequest {
                    operation_id: job.operation_id.clone(),
                    story_id: job.story_id.clone(),
                    user_id: job.user_id.clone(),
                    display_name: payload.display_name.clone().unwrap_or_default(),
                    script_content: payload.script_content.clone().unwrap_or_default(),
                    style: job.style().to_string(),
                };
                let reply = self
                    .model
                    .create_storyboard_task(request)
                    .await
                    .map_err(|e| model_failure("create storyboard", e))?;
                self.persister.persist_shots(scope, reply.shots).await
            }
            JobAction::RegenerateShot => {
                let request = RegenerateShotRequest {
                    operation_id: job.operation_id.clone(),
                    story_id: job.story_id.clone(),
                    shot_id: payload.shot_id.clone().unwrap_or_default(),
                    details: payload.shot_details.clone().unwrap_or_default(),
                    style: job.style().to_string(),
                    user_id: job.user_id.clone(),
                };
                let reply = self
                    .model
                    .regenerate_shot(request)
                    .await
                    .map_err(|e| model_failure("regenerate shot", e))?;
                let shot = reply.shot.ok_or_else(|| {
                    ServiceError::new(ErrorCode::ResultDataMissing, "regenerate reply carried no shot")
                })?;
                self.persister
                    .upsert_shot(scope, shot, job.shot_uuid())
                    .await
                    .map(|_| ())
            }
            JobAction::RenderVideo => {
                let request = RenderVideoRequest {
                    operation_id: job.operation_id.clone(),
                    story_id: job.story_id.clone(),
                    user_id: job.user_id.clone(),
                };
                let reply = self
                    .model
                    .render_video(request)
                    .await
                    .map_err(|e| model_failure("render video", e))?;
                self.persister.persist_video(scope, reply).await
            }
        }
    }

    async fn record_failure(&self, operation_id: EntityId, err: &ServiceError) {
        tracing::error!(operation_id = %operation_id, error = %err, "Job failed");
        if let Err(e) = self.operations.mark_failed(operation_id, err).await {
            tracing::warn!(operation_id = %operation_id, error = %e, "Could not record operation failure");
        }
    }

    /// Flag the shot (regenerate jobs) or the story (all others) as failed.
    /// A regenerate job without a usable shot id leaves the story alone.
    async fn mark_entity_failed(&self, job: &StoryJobMessage) {
        let Ok(user_id) = job.user_uuid() else {
            return;
        };

        let result = match (job.action(), job.shot_uuid()) {
            (Ok(JobAction::RegenerateShot), Some(shot_id)) => {
                self.store
                    .set_shot_status(shot_id, user_id, ShotStatus::Failed)
                    .await
            }
            (Ok(JobAction::RegenerateShot), None) => {
                tracing::warn!(
                    operation_id = %job.operation_id,
                    story_id = %job.story_id,
                    "Regenerate job has no valid shot id, story left unchanged"
                );
                return;
            }
            _ => match job.story_uuid() {
                Ok(story_id) => {
                    self.store
                        .set_story_status(story_id, user_id, StoryStatus::Failed)
                        .await
                }
                Err(_) => return,
            },
        };

        if let Err(e) = result {
            tracing::warn!(
                operation_id = %job.operation_id,
                story_id = %job.story_id,
                error = %e,
                "Could not mark story or shot failed"
            );
        }
    }
}

/// Classify a model call failure: deadline → `SVC2003`, anything else → `SVC4001`.
fn model_failure(call: &str, err: ModelError) -> ServiceError {
    let code = match err.code() {
        RpcCode::DeadlineExceeded => ErrorCode::OperationTimeout,
        _ => ErrorCode::WorkerExecutionFailed,
    };
    ServiceError::wrap(code, format!("model {call}"), err)
}
