//! Story entity and creation DTO.

use s2v_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StoryStatus;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: EntityId,
    pub user_id: EntityId,
    pub title: String,
    pub script_content: String,
    pub style: String,
    pub status: StoryStatus,
    pub cover_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Story {
    pub fn has_cover(&self) -> bool {
        self.cover_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Fields required to create a story.
#[derive(Debug, Clone)]
pub struct CreateStory {
    pub id: EntityId,
    pub user_id: EntityId,
    pub title: String,
    pub script_content: String,
    pub style: String,
    pub status: StoryStatus,
}
