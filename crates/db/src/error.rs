use s2v_core::types::EntityId;

/// Errors raised by a [`Datastore`](crate::store::Datastore) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing store cannot be reached.
    #[error("datastore unavailable")]
    Unavailable,

    /// A write targeted a row that does not exist for this owner.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: EntityId },

    /// An insert reused an id that is already taken.
    #[error("{entity} {id} already exists")]
    Conflict { entity: &'static str, id: EntityId },
}
