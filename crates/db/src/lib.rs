//! Persistence for stories, shots and operations.
//!
//! Callers go through the [`Datastore`](store::Datastore) seam. [`PgStore`]
//! backs it with Postgres via the repositories in [`repositories`];
//! [`MemoryStore`] keeps everything in process for tests and local runs.

pub mod error;
pub mod memory;
pub mod models;
pub mod operation_store;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use operation_store::OperationStore;
pub use store::{Datastore, PgStore};

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
