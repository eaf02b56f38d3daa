//! Repository for the `stories` table. Every query is scoped by `user_id`.

use s2v_core::types::EntityId;
use sqlx::{PgExecutor, PgPool};

use crate::models::status::StoryStatus;
use crate::models::story::{CreateStory, Story};

/// Column list for `stories` queries.
const COLUMNS: &str = "\
    id, user_id, title, script_content, style, status, cover_url, video_url, \
    created_at, updated_at";

pub struct StoryRepo;

impl StoryRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateStory,
    ) -> Result<Story, sqlx::Error> {
        let query = format!(
            "INSERT INTO stories (id, user_id, title, script_content, style, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(&input.title)
            .bind(&input.script_content)
            .bind(&input.style)
            .bind(input.status)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
        status: StoryStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stories SET status = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set `cover_url` only while it is still empty.
    pub async fn set_cover_if_unset(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
        cover_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stories SET cover_url = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND COALESCE(cover_url, '') = ''",
        )
        .bind(id)
        .bind(user_id)
        .bind(cover_url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a rendered video and mark the story `ready`.
    pub async fn set_video(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
        video_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE stories SET video_url = $3, status = $4, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(video_url)
        .bind(StoryStatus::Ready)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
