//! Request and reply messages of the storyboard RPC.
//!
//! Byte fields travel as standard base64 strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateStoryboardRequest {
    pub operation_id: String,
    pub story_id: String,
    pub user_id: String,
    pub display_name: String,
    pub script_content: String,
    pub style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateStoryboardReply {
    pub shots: Vec<ShotResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerateShotRequest {
    pub operation_id: String,
    pub story_id: String,
    pub shot_id: String,
    pub details: String,
    pub style: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerateShotReply {
    pub shot: Option<ShotResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderVideoRequest {
    pub operation_id: String,
    pub story_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderVideoReply {
    pub video_url: String,
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub video_data: Option<Vec<u8>>,
}

/// One generated shot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotResult {
    pub shot_id: String,
    pub sequence: String,
    pub title: String,
    pub description: String,
    pub script: String,
    pub details: String,
    pub narration: String,
    #[serde(rename = "type")]
    pub shot_type: String,
    pub transition: String,
    pub voice: String,
    pub image_url: String,
    pub bgm: String,
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
