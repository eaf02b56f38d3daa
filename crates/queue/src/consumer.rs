//! Consumer side of the job queue.

use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::publisher::ensure_stream_group;
use crate::PAYLOAD_FIELD;

/// One fetched message.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Queue-assigned message id, used to acknowledge.
    pub id: String,
    pub body: Vec<u8>,
    /// True when the message was handed out before and never acknowledged.
    pub redelivered: bool,
}

/// A queue that hands out messages and accepts acknowledgements.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Wait for the next message. `Ok(None)` means the wait timed out.
    async fn fetch(&self) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledge a message so it is never handed out again.
    async fn commit(&self, delivery: &Delivery) -> Result<(), QueueError>;
}

/// Consumer-group reader over a Redis stream.
///
/// Entries this consumer read but never acknowledged (for example before a
/// crash) are returned first, flagged as redeliveries, then new entries.
pub struct RedisStreamConsumer {
    reader: ConnectionManager,
    acker: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
    block_ms: usize,
    /// Last pending id returned, or `None` once the backlog is drained.
    pending_cursor: Mutex<Option<String>>,
}

impl RedisStreamConsumer {
    pub async fn connect(config: &QueueConfig, consumer: &str) -> Result<Self, QueueError> {
        let url = config.require_url()?;
        let client = redis::Client::open(url)
            .map_err(|e| QueueError::Config(format!("invalid queue url: {e}")))?;
        // Blocking reads would stall acknowledgements on a shared multiplexed
        // connection, so reads and acks use separate connections.
        let reader = ConnectionManager::new(client.clone()).await?;
        let acker = ConnectionManager::new(client).await?;

        if config.auto_create {
            ensure_stream_group(&acker, &config.stream, &config.group).await?;
        }

        Ok(Self {
            reader,
            acker,
            stream: config.stream.clone(),
            group: config.group.clone(),
            consumer: consumer.to_string(),
            block_ms: config.block_ms,
            pending_cursor: Mutex::new(Some("0".to_string())),
        })
    }

    fn cursor(&self) -> Option<String> {
        self.pending_cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_cursor(&self, cursor: Option<String>) {
        *self
            .pending_cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = cursor;
    }

    async fn read(&self, id: &str, block: bool) -> Result<Option<StreamId>, QueueError> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(1);
        if block {
            options = options.block(self.block_ms);
        }
        let mut conn = self.reader.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.stream], &[id], &options)
            .await?;
        Ok(reply
            .and_then(|r| r.keys.into_iter().next())
            .and_then(|key| key.ids.into_iter().next()))
    }

    async fn ack(&self, id: &str) -> Result<(), QueueError> {
        let mut conn = self.acker.clone();
        let _: i64 = conn.xack(&self.stream, &self.group, &[id]).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisStreamConsumer {
    async fn fetch(&self) -> Result<Option<Delivery>, QueueError> {
        while let Some(cursor) = self.cursor() {
            match self.read(&cursor, false).await? {
                Some(entry) => {
                    self.set_cursor(Some(entry.id.clone()));
                    match entry.get::<Vec<u8>>(PAYLOAD_FIELD) {
                        Some(body) => {
                            return Ok(Some(Delivery {
                                id: entry.id,
                                body,
                                redelivered: true,
                            }))
                        }
                        None => {
                            // Trimmed from the stream while pending.
                            tracing::warn!(entry_id = %entry.id, "Pending entry has no payload, acknowledging");
                            self.ack(&entry.id).await?;
                        }
                    }
                }
                None => {
                    tracing::debug!(consumer = %self.consumer, "Pending backlog drained");
                    self.set_cursor(None);
                }
            }
        }

        let Some(entry) = self.read(">", true).await? else {
            return Ok(None);
        };
        let body = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default();
        Ok(Some(Delivery {
            id: entry.id,
            body,
            redelivered: false,
        }))
    }

    async fn commit(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.ack(&delivery.id).await
    }
}
