//! Business operations behind the HTTP handlers.
//!
//! Each service creates its rows first, then dispatches the job. When the
//! dispatch fails the rows it created are marked failed before the typed
//! error is returned, so no operation is left `queued` without a job.

pub mod operation;
pub mod shot;
pub mod story;

pub use operation::OperationService;
pub use shot::ShotService;
pub use story::{validate_story_result, CreateStoryInput, StoryDetail, StoryService};

use s2v_core::error::{ErrorCode, ServiceError};
use s2v_core::types::{EntityId, Timestamp};
use s2v_db::models::operation::Operation;
use s2v_db::models::status::OperationStatus;
use s2v_db::{OperationStore, StoreError};
use serde::Serialize;

/// Handle returned to clients for an accepted long-running action.
#[derive(Debug, Clone, Serialize)]
pub struct OperationHandle {
    pub operation_name: String,
    pub state: OperationStatus,
    pub create_time: Timestamp,
}

impl From<&Operation> for OperationHandle {
    fn from(op: &Operation) -> Self {
        Self {
            operation_name: op.name(),
            state: op.status,
            create_time: op.created_at,
        }
    }
}

fn db_failed(action: &str, err: StoreError) -> ServiceError {
    ServiceError::wrap(ErrorCode::DatabaseActionFailed, action.to_string(), err)
}

/// Record a dispatch failure on the operation. Logged, never returned.
async fn fail_operation(operations: &OperationStore, operation_id: EntityId, cause: &ServiceError) {
    if let Err(e) = operations.mark_failed(operation_id, cause).await {
        tracing::error!(
            operation_id = %operation_id,
            error = %e,
            "Could not record dispatch failure",
        );
    }
}
