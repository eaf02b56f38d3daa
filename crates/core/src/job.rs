//! Job descriptors carried on the queue between the API and the worker.
//!
//! The wire format is JSON:
//!
//! ```text
//! { "operation_id": str, "story_id": str, "user_id": str,
//!   "payload": { "action": str, "display_name"?: str, "script_content"?: str,
//!                "style"?: str, "shot_id"?: str, "shot_details"?: str },
//!   "created_at": RFC3339 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::types::{EntityId, Timestamp};

/// What a job asks the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    CreateStoryboard,
    RegenerateShot,
    RenderVideo,
}

impl JobAction {
    /// Wire value of the `payload.action` field.
    pub fn as_str(self) -> &'static str {
        match self {
            JobAction::CreateStoryboard => "",
            JobAction::RegenerateShot => "regen_shot",
            JobAction::RenderVideo => "render_video",
        }
    }

    /// Parse a wire action. An empty action means "create storyboard".
    pub fn parse(raw: &str) -> ServiceResult<Self> {
        match raw.trim() {
            "" | "create" => Ok(JobAction::CreateStoryboard),
            "regen_shot" => Ok(JobAction::RegenerateShot),
            "render_video" => Ok(JobAction::RenderVideo),
            other => Err(ServiceError::new(
                ErrorCode::InvalidRequest,
                format!("unknown job action: {other}"),
            )),
        }
    }
}

/// Job-specific parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryJobPayload {
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_details: Option<String>,
}

/// One unit of work published to the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryJobMessage {
    pub operation_id: String,
    pub story_id: String,
    pub user_id: String,
    #[serde(default)]
    pub payload: StoryJobPayload,
    #[serde(default = "chrono::Utc::now")]
    pub created_at: Timestamp,
}

impl StoryJobMessage {
    /// Descriptor for generating the storyboard of a freshly created story.
    pub fn create_storyboard(
        operation_id: EntityId,
        story_id: EntityId,
        user_id: EntityId,
        display_name: &str,
        script_content: &str,
        style: &str,
        created_at: Timestamp,
    ) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            story_id: story_id.to_string(),
            user_id: user_id.to_string(),
            payload: StoryJobPayload {
                action: JobAction::CreateStoryboard.as_str().to_string(),
                display_name: Some(display_name.to_string()),
                script_content: Some(script_content.to_string()),
                style: Some(style.to_string()),
                ..Default::default()
            },
            created_at,
        }
    }

    /// Descriptor for regenerating a single shot from new details.
    pub fn regenerate_shot(
        operation_id: EntityId,
        story_id: EntityId,
        user_id: EntityId,
        shot_id: EntityId,
        details: &str,
        style: &str,
        created_at: Timestamp,
    ) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            story_id: story_id.to_string(),
            user_id: user_id.to_string(),
            payload: StoryJobPayload {
                action: JobAction::RegenerateShot.as_str().to_string(),
                style: Some(style.to_string()),
                shot_id: Some(shot_id.to_string()),
                shot_details: Some(details.to_string()),
                ..Default::default()
            },
            created_at,
        }
    }

    /// Descriptor for rendering the final video of a story.
    pub fn render_video(
        operation_id: EntityId,
        story_id: EntityId,
        user_id: EntityId,
        display_name: &str,
        style: &str,
        created_at: Timestamp,
    ) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            story_id: story_id.to_string(),
            user_id: user_id.to_string(),
            payload: StoryJobPayload {
                action: JobAction::RenderVideo.as_str().to_string(),
                display_name: Some(display_name.to_string()),
                style: Some(style.to_string()),
                ..Default::default()
            },
            created_at,
        }
    }

    /// Decode a queue message body.
    pub fn decode(body: &[u8]) -> ServiceResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::wrap(ErrorCode::InvalidRequest, "decode job", e))
    }

    /// Encode for publishing.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn action(&self) -> ServiceResult<JobAction> {
        JobAction::parse(&self.payload.action)
    }

    pub fn operation_uuid(&self) -> ServiceResult<EntityId> {
        parse_id("operation_id", &self.operation_id)
    }

    pub fn story_uuid(&self) -> ServiceResult<EntityId> {
        parse_id("story_id", &self.story_id)
    }

    pub fn user_uuid(&self) -> ServiceResult<EntityId> {
        parse_id("user_id", &self.user_id)
    }

    /// The target shot of a regenerate job, if it carries a valid one.
    pub fn shot_uuid(&self) -> Option<EntityId> {
        self.payload
            .shot_id
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }

    pub fn style(&self) -> &str {
        self.payload.style.as_deref().unwrap_or_default()
    }
}

/// Best-effort extraction of `operation_id` from a body that failed to
/// decode as a full [`StoryJobMessage`].
pub fn salvage_operation_id(body: &[u8]) -> Option<EntityId> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("operation_id")?.as_str()?.trim().parse().ok()
}

fn parse_id(field: &str, raw: &str) -> ServiceResult<EntityId> {
    raw.trim().parse().map_err(|e| {
        ServiceError::wrap(
            ErrorCode::InvalidRequest,
            format!("invalid {field}: {raw:?}"),
            e,
        )
    })
}
