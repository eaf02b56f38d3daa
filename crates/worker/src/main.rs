use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s2v_db::{Datastore, PgStore};
use s2v_model::RpcModelClient;
use s2v_queue::{JobQueue, QueueConfig, RedisStreamConsumer};
use s2v_worker::storage::build_storage;
use s2v_worker::{ConsumerLoop, JobHandler, WorkerConfig, WorkerPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "s2v_worker=debug,s2v_db=info,s2v_queue=info".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    let queue_config = QueueConfig::from_env();
    tracing::info!(
        worker = %config.worker_name,
        pool_size = config.pool_size,
        stream = %queue_config.stream,
        group = %queue_config.group,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = s2v_db::create_pool(&config.database_url, config.database_max_connections).await?;
    s2v_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");
    let store: Arc<dyn Datastore> = Arc::new(PgStore::new(pool));

    // --- Collaborators ---
    let model = RpcModelClient::new(
        &config.model_rpc_addr,
        Duration::from_secs(config.model_rpc_timeout_secs),
    )?;
    let storage = build_storage(
        config.storage_endpoint.as_deref(),
        config.storage_bucket.as_deref(),
    )?;
    let queue: Arc<dyn JobQueue> =
        Arc::new(RedisStreamConsumer::connect(&queue_config, &config.worker_name).await?);
    tracing::info!("Queue consumer connected");

    let handler = Arc::new(JobHandler::new(
        store,
        Arc::new(model),
        storage,
        config.worker_name.clone(),
    ));
    let consumer = Arc::new(ConsumerLoop::new(
        queue,
        handler,
        WorkerPool::new(config.pool_size),
    ));

    // --- Run ---
    let cancel = CancellationToken::new();
    let loop_handle = {
        let consumer = Arc::clone(&consumer);
        let cancel = cancel.clone();
        tokio::spawn(async move { consumer.run(cancel).await })
    };

    shutdown_signal().await;
    cancel.cancel();
    if let Err(e) = loop_handle.await {
        tracing::error!(error = %e, "Consumer loop task failed");
    }

    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if consumer.drain(timeout).await {
        tracing::info!("In-flight jobs finished");
    } else {
        tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "In-flight jobs still running at shutdown");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
