#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use s2v_core::job::StoryJobMessage;
use s2v_core::types::EntityId;
use s2v_db::models::operation::CreateOperation;
use s2v_db::models::shot::{CreateShot, ShotFields};
use s2v_db::models::status::{OperationType, ShotStatus, StoryStatus};
use s2v_db::models::story::CreateStory;
use s2v_db::{Datastore, MemoryStore};
use s2v_model::{
    CreateStoryboardReply, CreateStoryboardRequest, ModelError, ModelService, RegenerateShotReply,
    RegenerateShotRequest, RenderVideoReply, RenderVideoRequest, RpcCode, ShotResult,
};
use s2v_worker::{JobHandler, ObjectStorage, StorageError};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Model double
// ---------------------------------------------------------------------------

/// Scripted [`ModelService`]. Each call returns the configured reply, or
/// fails with `fail_with` when set.
#[derive(Default)]
pub struct FakeModel {
    pub shots: Mutex<Vec<ShotResult>>,
    pub regenerated: Mutex<Option<ShotResult>>,
    pub video: Mutex<RenderVideoReply>,
    pub fail_with: Mutex<Option<RpcCode>>,
    pub calls: AtomicUsize,
    pub last_regenerate: Mutex<Option<RegenerateShotRequest>>,
}

impl FakeModel {
    pub fn returning_shots(shots: Vec<ShotResult>) -> Arc<Self> {
        let model = Self::default();
        *model.shots.lock().unwrap() = shots;
        Arc::new(model)
    }

    pub fn failing(code: RpcCode) -> Arc<Self> {
        let model = Self::default();
        *model.fail_with.lock().unwrap() = Some(code);
        Arc::new(model)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.fail_with.lock().unwrap() {
            Some(code) => Err(ModelError::status(code, "scripted failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModelService for FakeModel {
    async fn create_storyboard_task(
        &self,
        _request: CreateStoryboardRequest,
    ) -> Result<CreateStoryboardReply, ModelError> {
        self.check()?;
        Ok(CreateStoryboardReply {
            shots: self.shots.lock().unwrap().clone(),
        })
    }

    async fn regenerate_shot(
        &self,
        request: RegenerateShotRequest,
    ) -> Result<RegenerateShotReply, ModelError> {
        self.check()?;
        *self.last_regenerate.lock().unwrap() = Some(request);
        Ok(RegenerateShotReply {
            shot: self.regenerated.lock().unwrap().clone(),
        })
    }

    async fn render_video(
        &self,
        _request: RenderVideoRequest,
    ) -> Result<RenderVideoReply, ModelError> {
        self.check()?;
        Ok(self.video.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Storage double
// ---------------------------------------------------------------------------

/// Keeps uploads in memory and answers with `mem://<key>` URLs.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub reject: bool,
}

impl MemoryStorage {
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.reject {
            return Err(StorageError::Rejected {
                status: 503,
                body: "bucket offline".into(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(format!("mem://{key}"))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A story in `generating` with a queued create operation.
pub struct Seeded {
    pub user_id: EntityId,
    pub story_id: EntityId,
    pub operation_id: EntityId,
}

pub async fn seed_story(store: &MemoryStore) -> Seeded {
    let user_id = Uuid::new_v4();
    let story_id = Uuid::new_v4();
    let operation_id = Uuid::new_v4();
    store
        .create_story_with_operation(
            &CreateStory {
                id: story_id,
                user_id,
                title: "Harbor at dawn".into(),
                script_content: "Boats drift out as the sun rises.".into(),
                style: "movie".into(),
                status: StoryStatus::Generating,
            },
            &CreateOperation {
                id: operation_id,
                user_id,
                story_id,
                shot_id: None,
                operation_type: OperationType::CreateStoryboard,
                payload: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
    Seeded {
        user_id,
        story_id,
        operation_id,
    }
}

/// Add a queued operation of `kind` to a seeded story.
pub async fn add_operation(
    store: &MemoryStore,
    seeded: &Seeded,
    kind: OperationType,
    shot_id: Option<EntityId>,
) -> EntityId {
    let id = Uuid::new_v4();
    store
        .create_operation(&CreateOperation {
            id,
            user_id: seeded.user_id,
            story_id: seeded.story_id,
            shot_id,
            operation_type: kind,
            payload: serde_json::json!({}),
        })
        .await
        .unwrap();
    id
}

pub async fn insert_shot(store: &MemoryStore, seeded: &Seeded, sequence: &str) -> EntityId {
    let id = Uuid::new_v4();
    store
        .insert_shot(&CreateShot {
            id,
            user_id: seeded.user_id,
            story_id: seeded.story_id,
            fields: ShotFields {
                sequence: sequence.into(),
                title: "Stored title".into(),
                details: "stored details".into(),
                ..Default::default()
            },
            status: ShotStatus::Done,
        })
        .await
        .unwrap();
    id
}

pub fn create_job(seeded: &Seeded) -> StoryJobMessage {
    StoryJobMessage::create_storyboard(
        seeded.operation_id,
        seeded.story_id,
        seeded.user_id,
        "Harbor at dawn",
        "Boats drift out as the sun rises.",
        "movie",
        Utc::now(),
    )
}

pub fn shot(sequence: &str, image_url: &str) -> ShotResult {
    ShotResult {
        sequence: sequence.into(),
        title: format!("Shot {sequence}"),
        description: "a description".into(),
        details: "some details".into(),
        narration: "a line".into(),
        image_url: image_url.into(),
        ..Default::default()
    }
}

pub fn handler(
    store: &Arc<MemoryStore>,
    model: Arc<FakeModel>,
    storage: Arc<dyn ObjectStorage>,
) -> JobHandler {
    JobHandler::new(store.clone(), model, storage, "worker-test")
}
