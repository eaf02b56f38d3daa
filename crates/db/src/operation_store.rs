//! Operation lifecycle transitions used by the worker and the dispatch
//! failure path.
//!
//! All four transitions are best-effort:
//! - a missing row is logged at debug level and treated as success;
//! - a store built with [`OperationStore::disabled`] turns them into no-ops;
//! - database failures come back as `SVC2002` for the caller to log.

use std::fmt::Display;
use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::types::EntityId;

use crate::error::StoreError;
use crate::store::Datastore;

/// Capacity of `operations.error_msg`, in characters.
pub const ERROR_MSG_MAX_CHARS: usize = 4096;

#[derive(Clone)]
pub struct OperationStore {
    store: Option<Arc<dyn Datastore>>,
}

impl OperationStore {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store: Some(store) }
    }

    /// A store with no backing datastore; every transition is a no-op.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub async fn mark_running(&self, operation_id: EntityId) -> ServiceResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let changed = store
            .mark_operation_running(operation_id)
            .await
            .map_err(|e| update_failed("mark running", e))?;
        log_unchanged(changed, operation_id, "running");
        Ok(())
    }

    pub async fn mark_succeeded(&self, operation_id: EntityId, worker: &str) -> ServiceResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let changed = store
            .mark_operation_succeeded(operation_id, worker)
            .await
            .map_err(|e| update_failed("mark succeeded", e))?;
        log_unchanged(changed, operation_id, "succeeded");
        Ok(())
    }

    /// Record `cause` as the operation's error message.
    pub async fn mark_failed(
        &self,
        operation_id: EntityId,
        cause: &(dyn Display + Sync),
    ) -> ServiceResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let message = truncate_chars(&cause.to_string(), ERROR_MSG_MAX_CHARS);
        let changed = store
            .mark_operation_failed(operation_id, &message)
            .await
            .map_err(|e| update_failed("mark failed", e))?;
        log_unchanged(changed, operation_id, "failed");
        Ok(())
    }

    pub async fn increment_retry(&self, operation_id: EntityId) -> ServiceResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let changed = store
            .increment_operation_retry(operation_id)
            .await
            .map_err(|e| update_failed("increment retry", e))?;
        log_unchanged(changed, operation_id, "retry");
        Ok(())
    }
}

fn update_failed(action: &str, err: StoreError) -> ServiceError {
    ServiceError::wrap(
        ErrorCode::OperationUpdateFailed,
        format!("{action} operation"),
        err,
    )
}

fn log_unchanged(changed: bool, operation_id: EntityId, target: &str) {
    if !changed {
        tracing::debug!(
            operation_id = %operation_id,
            target,
            "Operation not updated (missing or already terminal)",
        );
    }
}

/// Truncate to at most `max` characters, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
