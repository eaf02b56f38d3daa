/// Queue configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL. `None` leaves publishing in the failing state.
    pub url: Option<String>,
    pub stream: String,
    pub group: String,
    /// Create the stream and consumer group at startup when missing.
    pub auto_create: bool,
    /// Accept and drop every publish.
    pub publish_disabled: bool,
    /// How long a fetch blocks waiting for new entries.
    pub block_ms: usize,
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default        |
    /// |--------------------------|----------------|
    /// | `QUEUE_URL`              | unset          |
    /// | `QUEUE_STREAM`           | `story-jobs`   |
    /// | `QUEUE_GROUP`            | `story-worker` |
    /// | `QUEUE_AUTO_CREATE`      | `true`         |
    /// | `QUEUE_PUBLISH_DISABLED` | `false`        |
    /// | `QUEUE_BLOCK_MS`         | `5000`         |
    pub fn from_env() -> Self {
        let url = std::env::var("QUEUE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let stream = std::env::var("QUEUE_STREAM").unwrap_or_else(|_| "story-jobs".into());
        let group = std::env::var("QUEUE_GROUP").unwrap_or_else(|_| "story-worker".into());

        let auto_create = std::env::var("QUEUE_AUTO_CREATE")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("QUEUE_AUTO_CREATE must be true or false");

        let publish_disabled = std::env::var("QUEUE_PUBLISH_DISABLED")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("QUEUE_PUBLISH_DISABLED must be true or false");

        let block_ms = std::env::var("QUEUE_BLOCK_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("QUEUE_BLOCK_MS must be a valid usize");

        Self {
            url,
            stream,
            group,
            auto_create,
            publish_disabled,
            block_ms,
        }
    }

    /// The Redis URL, or a config error naming what is missing.
    pub fn require_url(&self) -> Result<&str, crate::QueueError> {
        match (&self.url, self.stream.is_empty(), self.group.is_empty()) {
            (Some(url), false, false) => Ok(url),
            _ => Err(crate::QueueError::Config(format!(
                "missing queue configuration, url={:?}, stream={:?}, group={:?}",
                self.url, self.stream, self.group
            ))),
        }
    }
}
