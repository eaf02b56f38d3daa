//! Job handling: operation lifecycle, failure marking, action dispatch.

mod common;

use std::sync::Arc;

use chrono::Utc;
use s2v_core::error::ErrorCode;
use s2v_core::job::StoryJobMessage;
use s2v_db::models::operation::Operation;
use s2v_db::models::status::{OperationStatus, OperationType, ShotStatus, StoryStatus};
use s2v_db::{Datastore, MemoryStore};
use s2v_model::{RenderVideoReply, RpcCode, ShotResult};
use s2v_worker::DisabledStorage;
use uuid::Uuid;

use common::{add_operation, create_job, handler, insert_shot, seed_story, shot, FakeModel};

async fn operation(store: &MemoryStore, id: Uuid) -> Operation {
    store.find_operation(id).await.unwrap().unwrap()
}

async fn story_status(store: &MemoryStore, seeded: &common::Seeded) -> StoryStatus {
    store
        .find_story(seeded.story_id, seeded.user_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

// ---------------------------------------------------------------------------
// Create storyboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_create_marks_operation_and_story() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::returning_shots(vec![shot("1", "http://x/1.png"), shot("2", "")]);
    let handler = handler(&store, model, Arc::new(DisabledStorage));

    let body = create_job(&seeded).encode().unwrap();
    handler.handle(&body).await.unwrap();

    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(op.status, OperationStatus::Succeeded);
    assert_eq!(op.worker.as_deref(), Some("worker-test"));
    assert!(op.started_at.is_some());
    assert!(op.finished_at.is_some());
    assert!(op.error_msg.is_none());

    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Ready);
    assert_eq!(store.shot_count(seeded.story_id), 2);
}

#[tokio::test]
async fn model_failure_fails_operation_and_story() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let handler = handler(&store, FakeModel::failing(RpcCode::Internal), Arc::new(DisabledStorage));

    let err = handler
        .handle(&create_job(&seeded).encode().unwrap())
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::WorkerExecutionFailed));

    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(op.status, OperationStatus::Failed);
    assert!(op.error_msg.as_deref().unwrap().starts_with("SVC4001"));
    assert!(op.started_at.is_some());
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Failed);
}

#[tokio::test]
async fn model_deadline_is_operation_timeout() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let handler = handler(
        &store,
        FakeModel::failing(RpcCode::DeadlineExceeded),
        Arc::new(DisabledStorage),
    );

    let err = handler
        .handle(&create_job(&seeded).encode().unwrap())
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::OperationTimeout));
    let op = operation(&store, seeded.operation_id).await;
    assert!(op.error_msg.as_deref().unwrap().starts_with("SVC2003"));
}

#[tokio::test]
async fn empty_storyboard_fails_and_story_never_ready() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let handler = handler(&store, FakeModel::returning_shots(vec![]), Arc::new(DisabledStorage));

    let err = handler
        .handle(&create_job(&seeded).encode().unwrap())
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::ShotMissingPartial));

    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(
        op.error_msg.as_deref(),
        Some("SVC4101: no shots returned")
    );
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Failed);
}

#[tokio::test]
async fn handling_a_finished_job_again_keeps_it_succeeded() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::returning_shots(vec![shot("1", "http://x/1.png")]);
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));
    let body = create_job(&seeded).encode().unwrap();

    handler.handle(&body).await.unwrap();
    let first = operation(&store, seeded.operation_id).await;
    handler.handle(&body).await.unwrap();
    let second = operation(&store, seeded.operation_id).await;

    assert_eq!(model.call_count(), 1);
    assert_eq!(second.status, OperationStatus::Succeeded);
    assert_eq!(second.started_at, first.started_at);
    assert_eq!(second.finished_at, first.finished_at);
    assert_eq!(store.shot_count(seeded.story_id), 1);
}

#[tokio::test]
async fn redelivered_finished_job_is_not_run_again() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::returning_shots(vec![shot("1", "http://x/1.png")]);
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));
    let body = create_job(&seeded).encode().unwrap();

    handler.handle(&body).await.unwrap();
    *model.fail_with.lock().unwrap() = Some(RpcCode::Unavailable);
    handler.handle(&body).await.unwrap();

    assert_eq!(model.call_count(), 1);
    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(op.status, OperationStatus::Succeeded);
    assert!(op.error_msg.is_none());
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Ready);
}

#[tokio::test]
async fn redelivered_failed_job_is_not_run_again() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::failing(RpcCode::Internal);
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));
    let body = create_job(&seeded).encode().unwrap();

    handler.handle(&body).await.unwrap_err();
    let first = operation(&store, seeded.operation_id).await;
    *model.fail_with.lock().unwrap() = None;
    handler.handle(&body).await.unwrap();

    assert_eq!(model.call_count(), 1);
    let second = operation(&store, seeded.operation_id).await;
    assert_eq!(second.status, OperationStatus::Failed);
    assert_eq!(second.error_msg, first.error_msg);
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Failed);
    assert_eq!(store.shot_count(seeded.story_id), 0);
}

// ---------------------------------------------------------------------------
// Malformed jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undecodable_body_still_fails_salvaged_operation() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let handler = handler(&store, FakeModel::returning_shots(vec![]), Arc::new(DisabledStorage));

    let body = format!(r#"{{"operation_id": "{}", "payload": 42}}"#, seeded.operation_id);
    let err = handler.handle(body.as_bytes()).await.unwrap_err();
    assert!(err.is(ErrorCode::InvalidRequest));

    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(op.status, OperationStatus::Failed);
    assert!(op.error_msg.as_deref().unwrap().starts_with("SVC1000"));
}

#[tokio::test]
async fn invalid_operation_id_is_invalid_request() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::returning_shots(vec![shot("1", "")]);
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));

    let mut job = create_job(&seeded);
    job.operation_id = "op-123".into();
    let err = handler.handle(&job.encode().unwrap()).await.unwrap_err();

    assert!(err.is(ErrorCode::InvalidRequest));
    assert_eq!(model.call_count(), 0);
    assert_eq!(
        operation(&store, seeded.operation_id).await.status,
        OperationStatus::Queued
    );
}

#[tokio::test]
async fn unknown_action_fails_operation_and_story() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let model = FakeModel::returning_shots(vec![shot("1", "")]);
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));

    let mut job = create_job(&seeded);
    job.payload.action = "explode".into();
    let err = handler.handle(&job.encode().unwrap()).await.unwrap_err();

    assert!(err.is(ErrorCode::InvalidRequest));
    assert_eq!(model.call_count(), 0);
    let op = operation(&store, seeded.operation_id).await;
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Failed);
}

// ---------------------------------------------------------------------------
// Regenerate shot
// ---------------------------------------------------------------------------

fn regenerate_job(seeded: &common::Seeded, operation_id: Uuid, shot_id: Uuid) -> StoryJobMessage {
    StoryJobMessage::regenerate_shot(
        operation_id,
        seeded.story_id,
        seeded.user_id,
        shot_id,
        "tighter framing",
        "movie",
        Utc::now(),
    )
}

#[tokio::test]
async fn regenerate_updates_target_shot() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let shot_id = insert_shot(&store, &seeded, "3").await;
    let op_id = add_operation(&store, &seeded, OperationType::RegenerateShot, Some(shot_id)).await;

    let model = FakeModel::returning_shots(vec![]);
    *model.regenerated.lock().unwrap() = Some(ShotResult {
        shot_id: shot_id.to_string(),
        sequence: "3".into(),
        details: "tighter framing".into(),
        image_url: "http://x/3b.png".into(),
        ..Default::default()
    });
    let handler = handler(&store, model.clone(), Arc::new(DisabledStorage));

    handler
        .handle(&regenerate_job(&seeded, op_id, shot_id).encode().unwrap())
        .await
        .unwrap();

    let request = model.last_regenerate.lock().unwrap().clone().unwrap();
    assert_eq!(request.shot_id, shot_id.to_string());
    assert_eq!(request.details, "tighter framing");

    let stored = store.find_shot(shot_id, seeded.user_id).await.unwrap().unwrap();
    assert_eq!(stored.details, "tighter framing");
    assert_eq!(stored.title, "Stored title");
    assert_eq!(stored.image_url, "http://x/3b.png");
    assert_eq!(stored.status, ShotStatus::Done);
    assert_eq!(store.shot_count(seeded.story_id), 1);
    assert_eq!(operation(&store, op_id).await.status, OperationStatus::Succeeded);
}

#[tokio::test]
async fn regenerate_failure_marks_only_the_shot() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let shot_id = insert_shot(&store, &seeded, "3").await;
    let op_id = add_operation(&store, &seeded, OperationType::RegenerateShot, Some(shot_id)).await;
    let handler = handler(&store, FakeModel::failing(RpcCode::Unavailable), Arc::new(DisabledStorage));

    handler
        .handle(&regenerate_job(&seeded, op_id, shot_id).encode().unwrap())
        .await
        .unwrap_err();

    let stored = store.find_shot(shot_id, seeded.user_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ShotStatus::Failed);
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Generating);
    assert_eq!(operation(&store, op_id).await.status, OperationStatus::Failed);
}

#[tokio::test]
async fn regenerate_failure_without_shot_id_leaves_story_alone() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let op_id = add_operation(&store, &seeded, OperationType::RegenerateShot, None).await;
    let handler = handler(&store, FakeModel::failing(RpcCode::Unavailable), Arc::new(DisabledStorage));

    let mut job = regenerate_job(&seeded, op_id, Uuid::new_v4());
    job.payload.shot_id = Some("shot-7".into());
    handler.handle(&job.encode().unwrap()).await.unwrap_err();

    assert_eq!(operation(&store, op_id).await.status, OperationStatus::Failed);
    assert_eq!(story_status(&store, &seeded).await, StoryStatus::Generating);
}

#[tokio::test]
async fn regenerate_reply_without_shot_is_result_missing() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let shot_id = insert_shot(&store, &seeded, "3").await;
    let op_id = add_operation(&store, &seeded, OperationType::RegenerateShot, Some(shot_id)).await;
    let handler = handler(&store, FakeModel::returning_shots(vec![]), Arc::new(DisabledStorage));

    let err = handler
        .handle(&regenerate_job(&seeded, op_id, shot_id).encode().unwrap())
        .await
        .unwrap_err();

    assert!(err.is(ErrorCode::ResultDataMissing));
    let stored = store.find_shot(shot_id, seeded.user_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ShotStatus::Failed);
}

// ---------------------------------------------------------------------------
// Render video
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_stores_video_url() {
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_story(&store).await;
    let op_id = add_operation(&store, &seeded, OperationType::RenderVideo, None).await;
    let model = FakeModel::returning_shots(vec![]);
    *model.video.lock().unwrap() = RenderVideoReply {
        video_url: "http://x/out.mp4".into(),
        video_data: None,
    };
    let handler = handler(&store, model, Arc::new(DisabledStorage));

    let job = StoryJobMessage::render_video(
        op_id,
        seeded.story_id,
        seeded.user_id,
        "Harbor at dawn",
        "movie",
        Utc::now(),
    );
    handler.handle(&job.encode().unwrap()).await.unwrap();

    let story = store
        .find_story(seeded.story_id, seeded.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(story.video_url.as_deref(), Some("http://x/out.mp4"));
    assert_eq!(story.status, StoryStatus::Ready);
    assert_eq!(operation(&store, op_id).await.status, OperationStatus::Succeeded);
}
