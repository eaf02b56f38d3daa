//! Job queue plumbing: publishing job descriptors and consuming them.
//!
//! Production runs on Redis Streams with a consumer group; [`MemoryQueue`]
//! implements both sides in process.

pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod publisher;

pub use config::QueueConfig;
pub use consumer::{Delivery, JobQueue, RedisStreamConsumer};
pub use dispatcher::JobDispatcher;
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use publisher::{FailingPublisher, JobPublisher, NoopPublisher, RedisStreamPublisher};

/// Stream entry field holding the encoded job descriptor.
pub const PAYLOAD_FIELD: &str = "payload";

/// Stream entry field holding the operation id, for inspection tools.
pub const KEY_FIELD: &str = "operation_id";
