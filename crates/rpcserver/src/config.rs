/// RPC server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `50051`).
    pub port: u16,
    /// Concurrent requests admitted; `<= 0` disables the gate (default: `8`).
    pub max_concurrency: i64,
    /// Per-request deadline in seconds; `0` means none (default: `0`).
    pub request_timeout_secs: u64,
    /// Base URL of the model-serving HTTP API (required).
    pub model_service_base_url: String,
    /// Timeout of calls to the model-serving API (default: `120`).
    pub model_service_timeout_secs: u64,
}

impl RpcServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default   |
    /// |------------------------------|-----------|
    /// | `RPC_HOST`                   | `0.0.0.0` |
    /// | `RPC_PORT`                   | `50051`   |
    /// | `RPC_MAX_CONCURRENCY`        | `8`       |
    /// | `RPC_REQUEST_TIMEOUT_SECS`   | `0`       |
    /// | `MODEL_SERVICE_BASE_URL`     | empty     |
    /// | `MODEL_SERVICE_TIMEOUT_SECS` | `120`     |
    pub fn from_env() -> Self {
        let host = std::env::var("RPC_HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("RPC_PORT")
            .unwrap_or_else(|_| "50051".into())
            .parse()
            .expect("RPC_PORT must be a valid u16");

        let max_concurrency: i64 = std::env::var("RPC_MAX_CONCURRENCY")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("RPC_MAX_CONCURRENCY must be a valid integer");

        let request_timeout_secs: u64 = std::env::var("RPC_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("RPC_REQUEST_TIMEOUT_SECS must be a valid u64");

        let model_service_base_url = std::env::var("MODEL_SERVICE_BASE_URL").unwrap_or_default();

        let model_service_timeout_secs: u64 = std::env::var("MODEL_SERVICE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("MODEL_SERVICE_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            max_concurrency,
            request_timeout_secs,
            model_service_base_url,
            model_service_timeout_secs,
        }
    }
}
