use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::types::EntityId;
use s2v_db::models::operation::Operation;
use s2v_db::Datastore;

use super::db_failed;

/// Resource-name prefix clients may send with an operation id.
pub const OPERATION_NAME_PREFIX: &str = "operations/";

pub struct OperationService {
    store: Arc<dyn Datastore>,
}

impl OperationService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Look up an operation by id or `operations/<id>` name.
    ///
    /// Operations owned by another user are reported as not found.
    pub async fn get(&self, user_id: EntityId, name: &str) -> ServiceResult<Operation> {
        let id = parse_operation_name(name)?;
        self.store
            .find_operation_for_user(id, user_id)
            .await
            .map_err(|e| db_failed("find operation", e))?
            .ok_or_else(|| ServiceError::from_code(ErrorCode::OperationNotFound))
    }
}

pub fn parse_operation_name(name: &str) -> ServiceResult<EntityId> {
    let raw = name.trim();
    let raw = raw.strip_prefix(OPERATION_NAME_PREFIX).unwrap_or(raw);
    raw.parse().map_err(|e| {
        ServiceError::wrap(
            ErrorCode::InvalidRequest,
            format!("invalid operation id: {raw:?}"),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn accepts_bare_and_prefixed_ids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_operation_name(&id.to_string()).unwrap(), id);
        assert_eq!(parse_operation_name(&format!("operations/{id}")).unwrap(), id);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_operation_name("operations/42").unwrap_err();
        assert!(err.is(ErrorCode::InvalidRequest));
    }
}
