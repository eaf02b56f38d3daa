//! Idempotent persistence of model results.
//!
//! A result resolves to an existing shot by id first, then by
//! `(story_id, sequence)`; only when neither matches is a new row inserted.
//! Updates are sparse: empty result fields never erase stored values, while
//! the shot status is always set to `done`. Redelivered jobs therefore
//! converge on the same rows.

use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::types::EntityId;
use s2v_db::models::shot::{CreateShot, Shot, ShotFields};
use s2v_db::models::status::{ShotStatus, StoryStatus};
use s2v_db::{Datastore, StoreError};
use s2v_model::{RenderVideoReply, ShotResult};
use uuid::Uuid;

use crate::storage::{ObjectStorage, StorageError};

/// The story a job writes into, and its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryScope {
    pub story_id: EntityId,
    pub user_id: EntityId,
}

pub struct ResultPersister {
    store: Arc<dyn Datastore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn Datastore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Write every shot of a storyboard, then mark the story `ready`.
    ///
    /// An empty result set is `SVC4101` and leaves the story untouched.
    pub async fn persist_shots(&self, scope: StoryScope, results: Vec<ShotResult>) -> ServiceResult<()> {
        if results.is_empty() {
            return Err(ServiceError::new(ErrorCode::ShotMissingPartial, "no shots returned"));
        }

        let mut any_image = false;
        for result in results {
            let shot = self.write_shot(scope, result, None).await?;
            any_image |= !shot.image_url.is_empty();
        }
        if any_image {
            self.derive_cover(scope).await;
        }

        self.store
            .set_story_status(scope.story_id, scope.user_id, StoryStatus::Ready)
            .await
            .map_err(|e| db_failed("mark story ready", e))?;
        tracing::info!(story_id = %scope.story_id, "Story ready");
        Ok(())
    }

    /// Write a single shot. `target` is the shot the job was about, used
    /// when the result carries no usable id of its own.
    pub async fn upsert_shot(
        &self,
        scope: StoryScope,
        result: ShotResult,
        target: Option<EntityId>,
    ) -> ServiceResult<Shot> {
        let shot = self.write_shot(scope, result, target).await?;
        if !shot.image_url.is_empty() {
            self.derive_cover(scope).await;
        }
        Ok(shot)
    }

    /// Record a rendered video on the story and mark it `ready`.
    /// Inline bytes are uploaded and take precedence over the remote URL.
    pub async fn persist_video(&self, scope: StoryScope, reply: RenderVideoReply) -> ServiceResult<()> {
        let mut video_url = reply.video_url;
        if let Some(data) = reply.video_data.filter(|d| !d.is_empty()) {
            let key = format!("{}/output.mp4", scope.story_id);
            video_url = self.upload_or_keep(&key, "video/mp4", data, video_url).await;
        }
        if video_url.is_empty() {
            return Err(ServiceError::new(
                ErrorCode::ResultDataMissing,
                "render reply carried no video",
            ));
        }

        self.store
            .set_story_video(scope.story_id, scope.user_id, &video_url)
            .await
            .map_err(|e| db_failed("store video url", e))?;
        tracing::info!(story_id = %scope.story_id, %video_url, "Video stored");
        Ok(())
    }

    // ---- private helpers ----

    async fn write_shot(
        &self,
        scope: StoryScope,
        result: ShotResult,
        target: Option<EntityId>,
    ) -> ServiceResult<Shot> {
        let sequence = if result.sequence.trim().is_empty() {
            result.shot_id.trim().to_string()
        } else {
            result.sequence.trim().to_string()
        };
        let details = if result.details.is_empty() {
            result.script
        } else {
            result.details
        };

        let mut image_url = result.image_url;
        if let Some(data) = result.image_data.filter(|d| !d.is_empty()) {
            let key = format!("{}/{}.png", scope.story_id, sequence);
            image_url = self.upload_or_keep(&key, "image/png", data, image_url).await;
        }

        let fields = ShotFields {
            sequence: sequence.clone(),
            title: result.title,
            description: result.description,
            details,
            narration: result.narration,
            shot_type: result.shot_type,
            transition: result.transition,
            voice: result.voice,
            bgm: result.bgm,
            image_url,
        };

        let explicit_id = result.shot_id.trim().parse::<Uuid>().ok().or(target);
        let existing = self.resolve(scope, explicit_id, &sequence).await?;
        let new_id = match (existing, explicit_id) {
            (None, Some(id)) => self.fresh_id(id).await?,
            _ => Uuid::new_v4(),
        };

        let shot = match existing {
            Some(id) => self
                .store
                .update_shot(id, scope.user_id, &fields, ShotStatus::Done)
                .await
                .map_err(|e| db_failed("update shot", e))?
                .ok_or_else(|| ServiceError::new(ErrorCode::ShotNotFound, format!("shot {id} vanished")))?,
            None => self
                .store
                .insert_shot(&CreateShot {
                    id: new_id,
                    user_id: scope.user_id,
                    story_id: scope.story_id,
                    fields,
                    status: ShotStatus::Done,
                })
                .await
                .map_err(|e| db_failed("insert shot", e))?,
        };

        tracing::debug!(
            story_id = %scope.story_id,
            shot_id = %shot.id,
            sequence = %shot.sequence,
            updated = existing.is_some(),
            "Shot persisted"
        );
        Ok(shot)
    }

    /// Id of the stored shot a result refers to, if any.
    async fn resolve(
        &self,
        scope: StoryScope,
        explicit_id: Option<EntityId>,
        sequence: &str,
    ) -> ServiceResult<Option<EntityId>> {
        if let Some(id) = explicit_id {
            let found = self
                .store
                .find_shot(id, scope.user_id)
                .await
                .map_err(|e| db_failed("find shot", e))?;
            if let Some(shot) = found.filter(|s| s.story_id == scope.story_id) {
                return Ok(Some(shot.id));
            }
        }

        let by_sequence = self
            .store
            .find_shot_by_sequence(scope.story_id, scope.user_id, sequence)
            .await
            .map_err(|e| db_failed("find shot by sequence", e))?;
        Ok(by_sequence.map(|s| s.id))
    }

    /// `id` when no shot anywhere uses it, otherwise a new random id.
    async fn fresh_id(&self, id: EntityId) -> ServiceResult<EntityId> {
        let taken = self
            .store
            .shot_id_taken(id)
            .await
            .map_err(|e| db_failed("check shot id", e))?;
        if taken {
            tracing::warn!(shot_id = %id, "Shot id belongs to another story, assigning a new one");
            return Ok(Uuid::new_v4());
        }
        Ok(id)
    }

    /// Set the story cover from the lowest-sequence shot with an image,
    /// unless a cover is already set. Failures are logged only.
    async fn derive_cover(&self, scope: StoryScope) {
        if let Err(e) = self.try_derive_cover(scope).await {
            tracing::warn!(story_id = %scope.story_id, error = %e, "Cover derivation failed");
        }
    }

    async fn try_derive_cover(&self, scope: StoryScope) -> Result<(), StoreError> {
        let Some(story) = self.store.find_story(scope.story_id, scope.user_id).await? else {
            return Ok(());
        };
        if story.has_cover() {
            return Ok(());
        }

        let shots = self.store.list_shots(scope.story_id, scope.user_id).await?;
        if let Some(shot) = shots.iter().find(|s| !s.image_url.is_empty()) {
            let changed = self
                .store
                .set_story_cover_if_unset(scope.story_id, scope.user_id, &shot.image_url)
                .await?;
            if changed {
                tracing::debug!(story_id = %scope.story_id, cover_url = %shot.image_url, "Cover set");
            }
        }
        Ok(())
    }

    /// Upload `data`, falling back to `fallback` when storage is disabled
    /// or the upload fails.
    async fn upload_or_keep(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
        fallback: String,
    ) -> String {
        match self.storage.upload(key, content_type, data).await {
            Ok(url) => url,
            Err(StorageError::Disabled) => fallback,
            Err(e) => {
                tracing::warn!(key, error = %e, "Upload failed, keeping remote URL");
                fallback
            }
        }
    }
}

fn db_failed(action: &str, err: StoreError) -> ServiceError {
    ServiceError::wrap(ErrorCode::DatabaseActionFailed, action, err)
}
