//! Process-local [`Datastore`] used by tests and single-process runs.
//!
//! Transition rules mirror the conditional updates in
//! [`OperationRepo`](crate::repositories::OperationRepo).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use s2v_core::sequence;
use s2v_core::types::EntityId;

use crate::error::StoreError;
use crate::models::operation::{CreateOperation, Operation};
use crate::models::shot::{CreateShot, Shot, ShotFields};
use crate::models::status::{OperationStatus, ShotStatus, StoryStatus};
use crate::models::story::{CreateStory, Story};
use crate::store::Datastore;

#[derive(Default)]
struct Tables {
    stories: HashMap<EntityId, Story>,
    shots: HashMap<EntityId, Shot>,
    operations: HashMap<EntityId, Operation>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of shots stored for a story.
    pub fn shot_count(&self, story_id: EntityId) -> usize {
        self.lock()
            .shots
            .values()
            .filter(|s| s.story_id == story_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(self.lock())
    }

    fn new_operation(input: &CreateOperation) -> Operation {
        let now = Utc::now();
        Operation {
            id: input.id,
            user_id: input.user_id,
            story_id: input.story_id,
            shot_id: input.shot_id,
            operation_type: input.operation_type,
            payload: input.payload.clone(),
            status: OperationStatus::Queued,
            retries: 0,
            error_msg: None,
            worker: None,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `change` to an operation when its status is accepted by `allowed`.
    fn transition(
        &self,
        id: EntityId,
        allowed: impl Fn(OperationStatus) -> bool,
        change: impl FnOnce(&mut Operation),
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables.operations.get_mut(&id) {
            Some(op) if allowed(op.status) => {
                change(op);
                op.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }

    async fn create_story_with_operation(
        &self,
        story: &CreateStory,
        operation: &CreateOperation,
    ) -> Result<(Story, Operation), StoreError> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let story = Story {
            id: story.id,
            user_id: story.user_id,
            title: story.title.clone(),
            script_content: story.script_content.clone(),
            style: story.style.clone(),
            status: story.status,
            cover_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };
        let operation = Self::new_operation(operation);
        tables.stories.insert(story.id, story.clone());
        tables.operations.insert(operation.id, operation.clone());
        Ok((story, operation))
    }

    async fn create_operation(
        &self,
        operation: &CreateOperation,
    ) -> Result<Operation, StoreError> {
        let mut tables = self.tables()?;
        let operation = Self::new_operation(operation);
        tables.operations.insert(operation.id, operation.clone());
        Ok(operation)
    }

    async fn begin_shot_regeneration(
        &self,
        shot_id: EntityId,
        user_id: EntityId,
        details: &str,
        operation: &CreateOperation,
    ) -> Result<Operation, StoreError> {
        let mut tables = self.tables()?;
        let shot = tables
            .shots
            .get_mut(&shot_id)
            .filter(|s| s.user_id == user_id)
            .ok_or(StoreError::NotFound {
                entity: "shot",
                id: shot_id,
            })?;
        if !details.is_empty() {
            shot.details = details.to_string();
        }
        shot.status = ShotStatus::Rendering;
        shot.updated_at = Utc::now();
        let operation = Self::new_operation(operation);
        tables.operations.insert(operation.id, operation.clone());
        Ok(operation)
    }

    async fn find_operation(&self, id: EntityId) -> Result<Option<Operation>, StoreError> {
        Ok(self.tables()?.operations.get(&id).cloned())
    }

    async fn find_operation_for_user(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Operation>, StoreError> {
        Ok(self
            .tables()?
            .operations
            .get(&id)
            .filter(|op| op.user_id == user_id)
            .cloned())
    }

    async fn mark_operation_running(&self, id: EntityId) -> Result<bool, StoreError> {
        self.transition(
            id,
            |s| matches!(s, OperationStatus::Queued | OperationStatus::Running),
            |op| {
                op.status = OperationStatus::Running;
                op.started_at.get_or_insert_with(Utc::now);
            },
        )
    }

    async fn mark_operation_succeeded(
        &self,
        id: EntityId,
        worker: &str,
    ) -> Result<bool, StoreError> {
        self.transition(
            id,
            |s| !s.is_terminal(),
            |op| {
                op.status = OperationStatus::Succeeded;
                op.worker = Some(worker.to_string());
                op.error_msg = None;
                op.finished_at = Some(Utc::now());
            },
        )
    }

    async fn mark_operation_failed(
        &self,
        id: EntityId,
        error_msg: &str,
    ) -> Result<bool, StoreError> {
        self.transition(
            id,
            |s| !s.is_terminal(),
            |op| {
                op.status = OperationStatus::Failed;
                op.error_msg = Some(error_msg.to_string());
                op.finished_at = Some(Utc::now());
            },
        )
    }

    async fn increment_operation_retry(&self, id: EntityId) -> Result<bool, StoreError> {
        self.transition(id, |_| true, |op| op.retries += 1)
    }

    async fn find_story(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Story>, StoreError> {
        Ok(self
            .tables()?
            .stories
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn set_story_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: StoryStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(match tables.stories.get_mut(&id) {
            Some(story) if story.user_id == user_id => {
                story.status = status;
                story.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn set_story_cover_if_unset(
        &self,
        id: EntityId,
        user_id: EntityId,
        cover_url: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(match tables.stories.get_mut(&id) {
            Some(story) if story.user_id == user_id && !story.has_cover() => {
                story.cover_url = Some(cover_url.to_string());
                story.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn set_story_video(
        &self,
        id: EntityId,
        user_id: EntityId,
        video_url: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(match tables.stories.get_mut(&id) {
            Some(story) if story.user_id == user_id => {
                story.video_url = Some(video_url.to_string());
                story.status = StoryStatus::Ready;
                story.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn find_shot(
        &self,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Shot>, StoreError> {
        Ok(self
            .tables()?
            .shots
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_shot_by_sequence(
        &self,
        story_id: EntityId,
        user_id: EntityId,
        sequence: &str,
    ) -> Result<Option<Shot>, StoreError> {
        Ok(self
            .tables()?
            .shots
            .values()
            .filter(|s| s.story_id == story_id && s.user_id == user_id && s.sequence == sequence)
            .min_by_key(|s| s.created_at)
            .cloned())
    }

    async fn shot_id_taken(&self, id: EntityId) -> Result<bool, StoreError> {
        Ok(self.tables()?.shots.contains_key(&id))
    }

    async fn insert_shot(&self, shot: &CreateShot) -> Result<Shot, StoreError> {
        let mut tables = self.tables()?;
        if tables.shots.contains_key(&shot.id) {
            return Err(StoreError::Conflict {
                entity: "shot",
                id: shot.id,
            });
        }
        let now = Utc::now();
        let f = &shot.fields;
        let row = Shot {
            id: shot.id,
            user_id: shot.user_id,
            story_id: shot.story_id,
            sequence: f.sequence.clone(),
            title: f.title.clone(),
            description: f.description.clone(),
            details: f.details.clone(),
            narration: f.narration.clone(),
            shot_type: f.shot_type.clone(),
            transition: f.transition.clone(),
            voice: f.voice.clone(),
            bgm: f.bgm.clone(),
            image_url: f.image_url.clone(),
            status: shot.status,
            created_at: now,
            updated_at: now,
        };
        tables.shots.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_shot(
        &self,
        id: EntityId,
        user_id: EntityId,
        fields: &ShotFields,
        status: ShotStatus,
    ) -> Result<Option<Shot>, StoreError> {
        let mut tables = self.tables()?;
        Ok(match tables.shots.get_mut(&id) {
            Some(shot) if shot.user_id == user_id => {
                fields.apply_to(shot);
                shot.status = status;
                shot.updated_at = Utc::now();
                Some(shot.clone())
            }
            _ => None,
        })
    }

    async fn set_shot_status(
        &self,
        id: EntityId,
        user_id: EntityId,
        status: ShotStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(match tables.shots.get_mut(&id) {
            Some(shot) if shot.user_id == user_id => {
                shot.status = status;
                shot.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn list_shots(
        &self,
        story_id: EntityId,
        user_id: EntityId,
    ) -> Result<Vec<Shot>, StoreError> {
        let mut shots: Vec<Shot> = self
            .tables()?
            .shots
            .values()
            .filter(|s| s.story_id == story_id && s.user_id == user_id)
            .cloned()
            .collect();
        sequence::sort_by_sequence(&mut shots);
        Ok(shots)
    }
}
