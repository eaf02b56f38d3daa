use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use s2v_core::job::StoryJobMessage;
use s2v_core::types::EntityId;
use s2v_db::models::shot::{CreateShot, Shot, ShotFields};
use s2v_db::models::status::ShotStatus;
use s2v_db::{Datastore, MemoryStore};
use s2v_queue::{JobDispatcher, JobPublisher, QueueError};
use tower::ServiceExt;
use uuid::Uuid;

use s2v_api::config::ServerConfig;
use s2v_api::router::build_app_router;
use s2v_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        database_url: String::new(),
        database_max_connections: 1,
    }
}

/// Publisher that records every job and optionally refuses them.
#[derive(Default)]
pub struct RecordingPublisher {
    jobs: Mutex<Vec<StoryJobMessage>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> Vec<StoryJobMessage> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn last(&self) -> StoryJobMessage {
        self.jobs().pop().expect("no job published")
    }
}

#[async_trait]
impl JobPublisher for RecordingPublisher {
    async fn publish(&self, job: &StoryJobMessage) -> Result<(), QueueError> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail {
            return Err(QueueError::Closed);
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
}

/// Build the full application router over an in-memory store.
pub fn build_test_app(publisher: RecordingPublisher) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(publisher);
    let state = AppState {
        store: store.clone(),
        dispatcher: Arc::new(JobDispatcher::new(publisher.clone())),
        config: Arc::new(test_config()),
    };
    TestApp {
        router: build_app_router(state),
        store,
        publisher,
    }
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    user: Option<EntityId>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &TestApp, uri: &str, user: Option<EntityId>) -> Response<Body> {
    send(app, Method::GET, uri, user, None).await
}

pub async fn post_json(
    app: &TestApp,
    uri: &str,
    user: Option<EntityId>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, user, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn story_body(style: &str) -> serde_json::Value {
    serde_json::json!({
        "display_name": "Night Walk",
        "script_content": "It was late when she left the station.",
        "style": style,
    })
}

/// Create a story through the API and return `(story_id, operation_id)`.
pub async fn create_story(app: &TestApp, user: EntityId) -> (EntityId, EntityId) {
    let response = post_json(app, "/api/v1/stories", Some(user), story_body("movie")).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    let job = app.publisher.last();
    (job.story_uuid().unwrap(), job.operation_uuid().unwrap())
}

/// Insert a complete `done` shot.
pub async fn insert_shot(
    store: &MemoryStore,
    user: EntityId,
    story_id: EntityId,
    seq: &str,
) -> Shot {
    store
        .insert_shot(&CreateShot {
            id: Uuid::new_v4(),
            user_id: user,
            story_id,
            fields: ShotFields {
                sequence: seq.into(),
                title: format!("Shot {seq}"),
                description: "A quiet street".into(),
                details: "stored details".into(),
                narration: "It was late.".into(),
                image_url: format!("http://cdn/{seq}.png"),
                ..Default::default()
            },
            status: ShotStatus::Done,
        })
        .await
        .unwrap()
}
