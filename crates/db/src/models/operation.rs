//! Operation entity and creation DTO.

use s2v_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{OperationStatus, OperationType};

/// A row from the `operations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Operation {
    pub id: EntityId,
    pub user_id: EntityId,
    pub story_id: EntityId,
    pub shot_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub payload: serde_json::Value,
    pub status: OperationStatus,
    pub retries: i32,
    pub error_msg: Option<String>,
    pub worker: Option<String>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Operation {
    /// Resource name returned to API clients.
    pub fn name(&self) -> String {
        format!("operations/{}", self.id)
    }
}

/// Fields required to create an operation. New operations start `queued`.
#[derive(Debug, Clone)]
pub struct CreateOperation {
    pub id: EntityId,
    pub user_id: EntityId,
    pub story_id: EntityId,
    pub shot_id: Option<EntityId>,
    pub operation_type: OperationType,
    pub payload: serde_json::Value,
}
