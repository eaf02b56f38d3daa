//! [`ModelService`] backed by the model-serving HTTP API.
//!
//! The model-serving API is loose about field names and types, so every
//! returned shot goes through [`convert_shot`] before it is handed on.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::{ModelError, ModelService, RpcCode};
use crate::types::*;

/// Default request timeout towards the model-serving API.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const CREATE_PATH: &str = "/api/v1/storyboard/create";
const REGENERATE_PATH: &str = "/api/v1/shot/regenerate";
const RENDER_PATH: &str = "/api/v1/video/render";

#[derive(Clone)]
pub struct ModelServingBackend {
    client: reqwest::Client,
    base_url: String,
}

impl ModelServingBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ModelError::status(
                RpcCode::InvalidArgument,
                "model service base url is empty",
            ));
        }
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    async fn post<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Req,
    ) -> Result<Resp, ModelError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: format!("{path}: {}", body.trim()),
            });
        }
        Ok(response.json::<Resp>().await?)
    }
}

/// Attach the call name to a failure and report it as `INTERNAL`.
fn internal(call: &str, err: ModelError) -> ModelError {
    ModelError::status(RpcCode::Internal, format!("{call}: {err}"))
}

#[async_trait]
impl ModelService for ModelServingBackend {
    async fn create_storyboard_task(
        &self,
        request: CreateStoryboardRequest,
    ) -> Result<CreateStoryboardReply, ModelError> {
        let response: StoryboardCreateResponse = self
            .post(CREATE_PATH, &request)
            .await
            .map_err(|e| internal("create storyboard", e))?;
        Ok(CreateStoryboardReply {
            shots: response.shots.into_iter().map(convert_shot).collect(),
        })
    }

    async fn regenerate_shot(
        &self,
        request: RegenerateShotRequest,
    ) -> Result<RegenerateShotReply, ModelError> {
        let payload = RegenerateShotPayload {
            operation_id: &request.operation_id,
            story_id: &request.story_id,
            shot_id: &request.shot_id,
            user_id: &request.user_id,
            detail: &request.details,
            style: &request.style,
        };
        let response: RegenerateShotResponse = self
            .post(REGENERATE_PATH, &payload)
            .await
            .map_err(|e| internal("regenerate shot", e))?;
        Ok(RegenerateShotReply {
            shot: Some(convert_shot(response.shot)),
        })
    }

    async fn render_video(
        &self,
        request: RenderVideoRequest,
    ) -> Result<RenderVideoReply, ModelError> {
        let response: RenderVideoResponse = self
            .post(RENDER_PATH, &request)
            .await
            .map_err(|e| internal("render video", e))?;
        Ok(RenderVideoReply {
            video_url: response.video_url,
            video_data: decode_base64(&[response.video_data.as_str()]),
        })
    }
}

// ---------------------------------------------------------------------------
// Model-serving wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RegenerateShotPayload<'a> {
    operation_id: &'a str,
    story_id: &'a str,
    shot_id: &'a str,
    user_id: &'a str,
    detail: &'a str,
    style: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoryboardCreateResponse {
    shots: Vec<ApiShot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegenerateShotResponse {
    shot: ApiShot,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenderVideoResponse {
    video_url: String,
    video_data: String,
}

/// A shot as returned by the model-serving API.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ApiShot {
    pub id: String,
    pub shot_id: String,
    /// String or number.
    pub sequence: Option<serde_json::Value>,
    pub subject: String,
    pub title: String,
    pub description: String,
    pub script: String,
    pub detail: String,
    pub details: String,
    pub camera: String,
    #[serde(rename = "type")]
    pub shot_type: String,
    pub transition: String,
    pub voice: String,
    pub tone: String,
    pub narration: String,
    pub bgm: String,
    pub image_url: String,
    pub image_path: String,
    pub image_base64: String,
    pub image_data: String,
}

/// Normalise a model-serving shot into a [`ShotResult`].
pub fn convert_shot(shot: ApiShot) -> ShotResult {
    let raw_sequence = match &shot.sequence {
        None | Some(serde_json::Value::Null) if shot.shot_id.is_empty() => {
            Some(serde_json::Value::String(shot.id.clone()))
        }
        other => other.clone(),
    };
    let mut sequence = normalize_sequence(raw_sequence.as_ref());
    let shot_id =
        first_non_empty(&[shot.id.as_str(), shot.shot_id.as_str(), sequence.as_str()]).to_string();
    if sequence.is_empty() {
        sequence = shot_id.clone();
    }

    let details = first_non_empty(&[shot.detail.as_str(), shot.details.as_str()]).to_string();
    let image_data = decode_base64(&[shot.image_base64.as_str(), shot.image_data.as_str()]);
    if image_data.is_none() {
        tracing::debug!(shot_id = %shot_id, "Shot has no inline image data");
    }

    ShotResult {
        title: first_non_empty(&[shot.title.as_str(), shot.subject.as_str()]).to_string(),
        description: first_non_empty(&[shot.description.as_str(), details.as_str()]).to_string(),
        script: first_non_empty(&[shot.script.as_str(), details.as_str()]).to_string(),
        shot_type: first_non_empty(&[shot.shot_type.as_str(), shot.camera.as_str()]).to_string(),
        voice: first_non_empty(&[shot.voice.as_str(), shot.tone.as_str()]).to_string(),
        image_url: first_non_empty(&[shot.image_url.as_str(), shot.image_path.as_str()])
            .to_string(),
        narration: shot.narration,
        transition: shot.transition,
        bgm: shot.bgm,
        shot_id,
        sequence,
        details,
        image_data,
    }
}

/// Render a string-or-number sequence as text. Fractional numbers are
/// truncated towards zero.
pub fn normalize_sequence(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| (f.trunc() as i64).to_string()).unwrap_or_default()
            }
        }
        _ => String::new(),
    }
}

fn first_non_empty<'a>(values: &[&'a str]) -> &'a str {
    values
        .iter()
        .copied()
        .find(|v| !v.trim().is_empty())
        .unwrap_or("")
}

/// Decode the first value that is valid base64, ignoring anything up to a
/// comma (data-URL prefixes).
pub fn decode_base64(values: &[&str]) -> Option<Vec<u8>> {
    values.iter().find_map(|raw| {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        let value = match value.find(',') {
            Some(idx) => &value[idx + 1..],
            None => value,
        };
        STANDARD.decode(value).ok()
    })
}
