//! Repository for the `shots` table.
//!
//! Listing returns rows in storage order; callers sort with
//! [`s2v_core::sequence`] so the ordering rule lives in one place.

use s2v_core::types::EntityId;
use sqlx::{PgExecutor, PgPool};

use crate::models::shot::{CreateShot, Shot, ShotFields};
use crate::models::status::ShotStatus;

/// Column list for `shots` queries.
const COLUMNS: &str = "\
    id, user_id, story_id, sequence, title, description, details, narration, \
    shot_type, transition, voice, bgm, image_url, status, created_at, updated_at";

pub struct ShotRepo;

impl ShotRepo {
    pub async fn create(pool: &PgPool, input: &CreateShot) -> Result<Shot, sqlx::Error> {
        let f = &input.fields;
        let query = format!(
            "INSERT INTO shots (id, user_id, story_id, sequence, title, description, details, \
                 narration, shot_type, transition, voice, bgm, image_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Shot>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(input.story_id)
            .bind(&f.sequence)
            .bind(&f.title)
            .bind(&f.description)
            .bind(&f.details)
            .bind(&f.narration)
            .bind(&f.shot_type)
            .bind(&f.transition)
            .bind(&f.voice)
            .bind(&f.bgm)
            .bind(&f.image_url)
            .bind(input.status)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Shot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM shots WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Shot>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether any shot, of any owner, uses `id`.
    pub async fn exists(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shots WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Oldest shot of a story with the given sequence.
    pub async fn find_by_sequence(
        pool: &PgPool,
        story_id: EntityId,
        user_id: EntityId,
        sequence: &str,
    ) -> Result<Option<Shot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM shots \
             WHERE story_id = $1 AND user_id = $2 AND sequence = $3 \
             ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Shot>(&query)
            .bind(story_id)
            .bind(user_id)
            .bind(sequence)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_story(
        pool: &PgPool,
        story_id: EntityId,
        user_id: EntityId,
    ) -> Result<Vec<Shot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM shots WHERE story_id = $1 AND user_id = $2");
        sqlx::query_as::<_, Shot>(&query)
            .bind(story_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Sparse update: empty strings leave the column untouched, `status`
    /// is always written.
    pub async fn update_fields(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
        fields: &ShotFields,
        status: ShotStatus,
    ) -> Result<Option<Shot>, sqlx::Error> {
        let query = format!(
            "UPDATE shots SET \
                 sequence = COALESCE(NULLIF($3, ''), sequence), \
                 title = COALESCE(NULLIF($4, ''), title), \
                 description = COALESCE(NULLIF($5, ''), description), \
                 details = COALESCE(NULLIF($6, ''), details), \
                 narration = COALESCE(NULLIF($7, ''), narration), \
                 shot_type = COALESCE(NULLIF($8, ''), shot_type), \
                 transition = COALESCE(NULLIF($9, ''), transition), \
                 voice = COALESCE(NULLIF($10, ''), voice), \
                 bgm = COALESCE(NULLIF($11, ''), bgm), \
                 image_url = COALESCE(NULLIF($12, ''), image_url), \
                 status = $13, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Shot>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&fields.sequence)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.details)
            .bind(&fields.narration)
            .bind(&fields.shot_type)
            .bind(&fields.transition)
            .bind(&fields.voice)
            .bind(&fields.bgm)
            .bind(&fields.image_url)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Set status and, when non-empty, details. Used when a regeneration is
    /// requested.
    pub async fn begin_regeneration<'e, E: PgExecutor<'e>>(
        executor: E,
        id: EntityId,
        user_id: EntityId,
        details: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shots SET details = COALESCE(NULLIF($3, ''), details), status = $4, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(details)
        .bind(ShotStatus::Rendering)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
        status: ShotStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shots SET status = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
