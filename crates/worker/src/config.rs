/// Worker configuration loaded from environment variables.
///
/// Queue settings live in [`s2v_queue::QueueConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identity recorded on finished operations and used as the queue
    /// consumer name. Must be unique per running instance.
    pub worker_name: String,
    /// Handlers running concurrently; `0` processes every job inline.
    pub pool_size: usize,
    /// How long to wait for in-flight handlers on shutdown.
    pub shutdown_timeout_secs: u64,
    pub model_rpc_addr: String,
    pub model_rpc_timeout_secs: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub storage_endpoint: Option<String>,
    pub storage_bucket: Option<String>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                  |
    /// |--------------------------------|--------------------------|
    /// | `WORKER_NAME`                  | `story-worker`           |
    /// | `WORKER_POOL_SIZE`             | `8`                      |
    /// | `WORKER_SHUTDOWN_TIMEOUT_SECS` | `30`                     |
    /// | `MODEL_RPC_ADDR`               | `http://127.0.0.1:50051` |
    /// | `MODEL_RPC_TIMEOUT_SECS`       | `300`                    |
    /// | `DATABASE_URL`                 | (required)               |
    /// | `DATABASE_MAX_CONNECTIONS`     | `20`                     |
    /// | `STORAGE_ENDPOINT`             | unset (uploads disabled) |
    /// | `STORAGE_BUCKET`               | unset (uploads disabled) |
    pub fn from_env() -> Self {
        let worker_name = std::env::var("WORKER_NAME").unwrap_or_else(|_| "story-worker".into());

        let pool_size: usize = std::env::var("WORKER_POOL_SIZE")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("WORKER_POOL_SIZE must be a valid usize");

        let shutdown_timeout_secs: u64 = std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("WORKER_SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let model_rpc_addr =
            std::env::var("MODEL_RPC_ADDR").unwrap_or_else(|_| "http://127.0.0.1:50051".into());

        let model_rpc_timeout_secs: u64 = std::env::var("MODEL_RPC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("MODEL_RPC_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let database_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DATABASE_MAX_CONNECTIONS must be a valid u32");

        Self {
            worker_name,
            pool_size,
            shutdown_timeout_secs,
            model_rpc_addr,
            model_rpc_timeout_secs,
            database_url,
            database_max_connections,
            storage_endpoint: non_empty_var("STORAGE_ENDPOINT"),
            storage_bucket: non_empty_var("STORAGE_BUCKET"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
