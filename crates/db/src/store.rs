//! The [`Datastore`] seam and its Postgres implementation.

use async_trait::async_trait;
use s2v_core::sequence;
use s2v_core::types::EntityId;

use crate::error::StoreError;
use crate::models::operation::{CreateOperation, Operation};
use crate::models::shot::{CreateShot, Shot, ShotFields};
use crate::models::status::{ShotStatus, StoryStatus};
use crate::models::story::{CreateStory, Story};
use crate::repositories::{OperationRepo, ShotRepo, StoryRepo};
use crate::DbPool;

/// Storage operations shared by the API, the worker and the persister.
///
/// Mutators that return `bool` report whether a row was changed; a missing
/// row is not an error.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Confirm the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    // -- operations --

    /// Create a story and its first operation atomically.
    async fn create_story_with_operation(
        &self,
        story: &CreateStory,
        operation: &CreateOperation,
    ) -> Result<(Story, Operation), StoreError>;

    async fn create_operation(&self, operation: &CreateOperation)
        -> Result<Operation, StoreError>;

    /// Put a shot into `rendering` (updating details when non-empty) and
    /// create the regenerate operation atomically.
    async fn begin_shot_regeneration(
        &self,
        shot_id: EntityId,
        user_id: EntityId,
        details: &str,
        operation: &CreateOperation,
    ) -> Result<Operation, StoreError>;

    async fn find_operation(&self, id: EntityId) -> Result<Option<Operation>, StoreError>;

    async fn find_operation_for_user(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Operation>, StoreError>;

    async fn mark_operation_running(&self, id: EntityId) -> Result<bool, StoreError>;

    async fn mark_operation_succeeded(&self, id: EntityId, worker: &str)
        -> Result<bool, StoreError>;

    async fn mark_operation_failed(&self, id: EntityId, error_msg: &str)
        -> Result<bool, StoreError>;

    async fn increment_operation_retry(&self, id: EntityId) -> Result<bool, StoreError>;

    // -- stories --

    async fn find_story(&self, id: EntityId, user_id: EntityId)
        -> Result<Option<Story>, StoreError>;

    async fn set_story_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: StoryStatus,
    ) -> Result<bool, StoreError>;

    async fn set_story_cover_if_unset(
        &self,
        id: EntityId,
        user_id: EntityId,
        cover_url: &str,
    ) -> Result<bool, StoreError>;

    async fn set_story_video(
        &self,
        id: EntityId,
        user_id: EntityId,
        video_url: &str,
    ) -> Result<bool, StoreError>;

    // -- shots --

    async fn find_shot(&self, id: EntityId, user_id: EntityId)
        -> Result<Option<Shot>, StoreError>;

    async fn find_shot_by_sequence(
        &self,
        story_id: EntityId,
        user_id: EntityId,
        sequence: &str,
    ) -> Result<Option<Shot>, StoreError>;

    /// True when `id` is taken by any shot, regardless of owner.
    async fn shot_id_taken(&self, id: EntityId) -> Result<bool, StoreError>;

    async fn insert_shot(&self, shot: &CreateShot) -> Result<Shot, StoreError>;

    /// Sparse update; `None` when the shot does not exist for this owner.
    async fn update_shot(
        &self,
        id: EntityId,
        user_id: EntityId,
        fields: &ShotFields,
        status: ShotStatus,
    ) -> Result<Option<Shot>, StoreError>;

    async fn set_shot_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: ShotStatus,
    ) -> Result<bool, StoreError>;

    /// Shots of a story ordered by sequence, then creation time.
    async fn list_shots(&self, story_id: EntityId, user_id: EntityId)
        -> Result<Vec<Shot>, StoreError>;
}

/// Postgres-backed [`Datastore`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Datastore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn create_story_with_operation(
        &self,
        story: &CreateStory,
        operation: &CreateOperation,
    ) -> Result<(Story, Operation), StoreError> {
        let mut tx = self.pool.begin().await?;
        let story = StoryRepo::create(&mut *tx, story).await?;
        let operation = OperationRepo::create(&mut *tx, operation).await?;
        tx.commit().await?;
        Ok((story, operation))
    }

    async fn create_operation(
        &self,
        operation: &CreateOperation,
    ) -> Result<Operation, StoreError> {
        Ok(OperationRepo::create(&self.pool, operation).await?)
    }

    async fn begin_shot_regeneration(
        &self,
        shot_id: EntityId,
        user_id: EntityId,
        details: &str,
        operation: &CreateOperation,
    ) -> Result<Operation, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !ShotRepo::begin_regeneration(&mut *tx, shot_id, user_id, details).await? {
            return Err(StoreError::NotFound {
                entity: "shot",
                id: shot_id,
            });
        }
        let operation = OperationRepo::create(&mut *tx, operation).await?;
        tx.commit().await?;
        Ok(operation)
    }

    async fn find_operation(&self, id: EntityId) -> Result<Option<Operation>, StoreError> {
        Ok(OperationRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_operation_for_user(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Operation>, StoreError> {
        Ok(OperationRepo::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn mark_operation_running(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(OperationRepo::mark_running(&self.pool, id).await?)
    }

    async fn mark_operation_succeeded(
        &self,
        id: EntityId,
        worker: &str,
    ) -> Result<bool, StoreError> {
        Ok(OperationRepo::mark_succeeded(&self.pool, id, worker).await?)
    }

    async fn mark_operation_failed(
        &self,
        id: EntityId,
        error_msg: &str,
    ) -> Result<bool, StoreError> {
        Ok(OperationRepo::mark_failed(&self.pool, id, error_msg).await?)
    }

    async fn increment_operation_retry(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(OperationRepo::increment_retry(&self.pool, id).await?)
    }

    async fn find_story(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Story>, StoreError> {
        Ok(StoryRepo::find_by_id(&self.pool, id, user_id).await?)
    }

    async fn set_story_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: StoryStatus,
    ) -> Result<bool, StoreError> {
        Ok(StoryRepo::set_status(&self.pool, id, user_id, status).await?)
    }

    async fn set_story_cover_if_unset(
        &self,
        id: EntityId,
        user_id: EntityId,
        cover_url: &str,
    ) -> Result<bool, StoreError> {
        Ok(StoryRepo::set_cover_if_unset(&self.pool, id, user_id, cover_url).await?)
    }

    async fn set_story_video(
        &self,
        id: EntityId,
        user_id: EntityId,
        video_url: &str,
    ) -> Result<bool, StoreError> {
        Ok(StoryRepo::set_video(&self.pool, id, user_id, video_url).await?)
    }

    async fn find_shot(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Shot>, StoreError> {
        Ok(ShotRepo::find_by_id(&self.pool, id, user_id).await?)
    }

    async fn find_shot_by_sequence(
        &self,
        story_id: EntityId,
        user_id: EntityId,
        sequence: &str,
    ) -> Result<Option<Shot>, StoreError> {
        Ok(ShotRepo::find_by_sequence(&self.pool, story_id, user_id, sequence).await?)
    }

    async fn shot_id_taken(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(ShotRepo::exists(&self.pool, id).await?)
    }

    async fn insert_shot(&self, shot: &CreateShot) -> Result<Shot, StoreError> {
        Ok(ShotRepo::create(&self.pool, shot).await?)
    }

    async fn update_shot(
        &self,
        id: EntityId,
        user_id: EntityId,
        fields: &ShotFields,
        status: ShotStatus,
    ) -> Result<Option<Shot>, StoreError> {
        Ok(ShotRepo::update_fields(&self.pool, id, user_id, fields, status).await?)
    }

    async fn set_shot_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: ShotStatus,
    ) -> Result<bool, StoreError> {
        Ok(ShotRepo::set_status(&self.pool, id, user_id, status).await?)
    }

    async fn list_shots(
        &self,
        story_id: EntityId,
        user_id: EntityId,
    ) -> Result<Vec<Shot>, StoreError> {
        let mut shots = ShotRepo::list_by_story(&self.pool, story_id, user_id).await?;
        sequence::sort_by_sequence(&mut shots);
        Ok(shots)
    }
}
