//! Repository for the `operations` table.
//!
//! Every transition is a single conditional `UPDATE ... WHERE id = $1`
//! guarded by the allowed source statuses, so a terminal operation never
//! moves back. Each mutator returns whether a row was changed.

use s2v_core::types::EntityId;
use sqlx::{PgExecutor, PgPool};

use crate::models::operation::{CreateOperation, Operation};
use crate::models::status::OperationStatus;

/// Column list for `operations` queries.
const COLUMNS: &str = "\
    id, user_id, story_id, shot_id, operation_type, payload, status, retries, \
    error_msg, worker, started_at, finished_at, created_at, updated_at";

pub struct OperationRepo;

impl OperationRepo {
    /// Insert a new `queued` operation.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateOperation,
    ) -> Result<Operation, sqlx::Error> {
        let query = format!(
            "INSERT INTO operations (id, user_id, story_id, shot_id, operation_type, payload, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Operation>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(input.story_id)
            .bind(input.shot_id)
            .bind(input.operation_type)
            .bind(&input.payload)
            .bind(OperationStatus::Queued)
            .fetch_one(executor)
            .await
    }

    /// Find an operation by id regardless of owner.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Operation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operations WHERE id = $1");
        sqlx::query_as::<_, Operation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an operation owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: EntityId,
        user_id: EntityId,
    ) -> Result<Option<Operation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operations WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Operation>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// `queued`/`running` -> `running`. `started_at` is set on first entry only.
    pub async fn mark_running(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operations \
             SET status = $2, started_at = COALESCE(started_at, NOW()), updated_at = NOW() \
             WHERE id = $1 AND status IN ($3, $2)",
        )
        .bind(id)
        .bind(OperationStatus::Running)
        .bind(OperationStatus::Queued)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Non-terminal -> `succeeded`, recording the worker and clearing any error.
    pub async fn mark_succeeded(
        pool: &PgPool,
        id: EntityId,
        worker: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operations \
             SET status = $2, worker = $3, error_msg = NULL, \
                 finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status IN ($4, $5)",
        )
        .bind(id)
        .bind(OperationStatus::Succeeded)
        .bind(worker)
        .bind(OperationStatus::Queued)
        .bind(OperationStatus::Running)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `queued`/`running` -> `failed`. Terminal rows keep their first outcome.
    pub async fn mark_failed(
        pool: &PgPool,
        id: EntityId,
        error_msg: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operations \
             SET status = $2, error_msg = $3, finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ($2, $4, $5)",
        )
        .bind(id)
        .bind(OperationStatus::Failed)
        .bind(error_msg)
        .bind(OperationStatus::Succeeded)
        .bind(OperationStatus::Cancelled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_retry(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operations SET retries = retries + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
