use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::job::StoryJobMessage;
use s2v_core::types::EntityId;
use s2v_db::models::operation::CreateOperation;
use s2v_db::models::shot::{Shot, ShotFields};
use s2v_db::models::status::{OperationType, ShotStatus};
use s2v_db::models::story::Story;
use s2v_db::{Datastore, OperationStore, StoreError};
use s2v_queue::JobDispatcher;
use uuid::Uuid;

use super::{db_failed, fail_operation, OperationHandle};

/// Shot reads, edits, regeneration and video rendering.
pub struct ShotService {
    store: Arc<dyn Datastore>,
    dispatcher: Arc<JobDispatcher>,
}

impl ShotService {
    pub fn new(store: Arc<dyn Datastore>, dispatcher: Arc<JobDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Shots of a story in sequence order.
    pub async fn list(&self, user_id: EntityId, story_id: EntityId) -> ServiceResult<Vec<Shot>> {
        let story = self.owned_story(user_id, story_id).await?;
        self.store
            .list_shots(story.id, user_id)
            .await
            .map_err(|e| db_failed("list shots", e))
    }

    pub async fn get(
        &self,
        user_id: EntityId,
        story_id: EntityId,
        shot_id: EntityId,
    ) -> ServiceResult<Shot> {
        self.owned_shot(user_id, story_id, shot_id).await
    }

    /// Edit a shot's content. Empty values keep what is stored; the
    /// sequence and status are not editable here.
    pub async fn update(
        &self,
        user_id: EntityId,
        story_id: EntityId,
        shot_id: EntityId,
        fields: ShotFields,
    ) -> ServiceResult<Shot> {
        let fields = ShotFields {
            sequence: String::new(),
            ..fields
        };
        if fields.is_empty() {
            return Err(ServiceError::new(
                ErrorCode::InvalidRequest,
                "no fields to update",
            ));
        }

        let shot = self.owned_shot(user_id, story_id, shot_id).await?;
        let updated = self
            .store
            .update_shot(shot.id, user_id, &fields, shot.status)
            .await
            .map_err(|e| db_failed("update shot", e))?
            .ok_or_else(|| ServiceError::from_code(ErrorCode::ShotNotFound))?;

        tracing::info!(story_id = %story_id, shot_id = %shot_id, "Shot updated");
        Ok(updated)
    }

    /// Regenerate one shot. Blank `details` fall back to the stored ones.
    pub async fn regenerate(
        &self,
        user_id: EntityId,
        story_id: EntityId,
        shot_id: EntityId,
        details: Option<&str>,
    ) -> ServiceResult<OperationHandle> {
        let story = self.owned_story(user_id, story_id).await?;
        let shot = self.owned_shot(user_id, story.id, shot_id).await?;

        let details = details
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| shot.details.trim())
            .to_string();
        if details.is_empty() {
            return Err(ServiceError::new(
                ErrorCode::InvalidShotDetails,
                "details cannot be empty",
            ));
        }

        let operation = CreateOperation {
            id: Uuid::new_v4(),
            user_id,
            story_id: story.id,
            shot_id: Some(shot.id),
            operation_type: OperationType::RegenerateShot,
            payload: serde_json::json!({
                "shot_id": shot.id,
                "details": details,
            }),
        };
        let operation = self
            .store
            .begin_shot_regeneration(shot.id, user_id, &details, &operation)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => ServiceError::from_code(ErrorCode::ShotNotFound),
                other => ServiceError::wrap(ErrorCode::OperationCreateFailed, "regenerate shot", other),
            })?;

        let job = StoryJobMessage::regenerate_shot(
            operation.id,
            story.id,
            user_id,
            shot.id,
            &details,
            &story.style,
            operation.created_at,
        );
        if let Err(err) = self.dispatcher.dispatch(&job).await {
            fail_operation(&OperationStore::new(Arc::clone(&self.store)), operation.id, &err).await;
            if let Err(e) = self
                .store
                .set_shot_status(shot.id, user_id, ShotStatus::Failed)
                .await
            {
                tracing::error!(shot_id = %shot.id, error = %e, "Could not mark shot failed");
            }
            return Err(err);
        }

        tracing::info!(
            story_id = %story.id,
            shot_id = %shot.id,
            operation_id = %operation.id,
            "Shot regeneration queued",
        );
        Ok(OperationHandle::from(&operation))
    }

    /// Render the final video of a story.
    pub async fn render(
        &self,
        user_id: EntityId,
        story_id: EntityId,
    ) -> ServiceResult<OperationHandle> {
        let story = self.owned_story(user_id, story_id).await?;

        let operation = CreateOperation {
            id: Uuid::new_v4(),
            user_id,
            story_id: story.id,
            shot_id: None,
            operation_type: OperationType::RenderVideo,
            payload: serde_json::json!({ "story_id": story.id }),
        };
        let operation = self
            .store
            .create_operation(&operation)
            .await
            .map_err(|e| ServiceError::wrap(ErrorCode::OperationCreateFailed, "render video", e))?;

        let job = StoryJobMessage::render_video(
            operation.id,
            story.id,
            user_id,
            &story.title,
            &story.style,
            operation.created_at,
        );
        if let Err(err) = self.dispatcher.dispatch(&job).await {
            fail_operation(&OperationStore::new(Arc::clone(&self.store)), operation.id, &err).await;
            return Err(err);
        }

        tracing::info!(
            story_id = %story.id,
            operation_id = %operation.id,
            "Video render queued",
        );
        Ok(OperationHandle::from(&operation))
    }

    async fn owned_story(&self, user_id: EntityId, story_id: EntityId) -> ServiceResult<Story> {
        self.store
            .find_story(story_id, user_id)
            .await
            .map_err(|e| db_failed("find story", e))?
            .ok_or_else(|| ServiceError::from_code(ErrorCode::StoryNotFound))
    }

    /// A shot of the user's story; a shot of another story is not found.
    async fn owned_shot(
        &self,
        user_id: EntityId,
        story_id: EntityId,
        shot_id: EntityId,
    ) -> ServiceResult<Shot> {
        self.store
            .find_shot(shot_id, user_id)
            .await
            .map_err(|e| db_failed("find shot", e))?
            .filter(|shot| shot.story_id == story_id)
            .ok_or_else(|| ServiceError::from_code(ErrorCode::ShotNotFound))
    }
}
