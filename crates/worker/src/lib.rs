//! Story job worker.
//!
//! Pulls job descriptors off the queue, calls the storyboard model and
//! writes the results back through the [`Datastore`](s2v_db::Datastore).

pub mod config;
pub mod consumer;
pub mod handler;
pub mod persister;
pub mod pool;
pub mod storage;

pub use config::WorkerConfig;
pub use consumer::ConsumerLoop;
pub use handler::JobHandler;
pub use persister::{ResultPersister, StoryScope};
pub use pool::WorkerPool;
pub use storage::{DisabledStorage, HttpObjectStorage, ObjectStorage, StorageError};
