use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s2v_api::config::ServerConfig;
use s2v_api::router::build_app_router;
use s2v_api::state::AppState;
use s2v_db::PgStore;
use s2v_queue::publisher::connect_publisher;
use s2v_queue::{JobDispatcher, QueueConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "s2v_api=debug,s2v_queue=info,tower_http=debug".into());
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
    let config = ServerConfig::from_env();
    let queue_config = QueueConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        stream = %queue_config.stream,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = s2v_db::create_pool(&config.database_url, config.database_max_connections).await?;
    s2v_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");
    s2v_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Queue ---
    let publisher = connect_publisher(&queue_config).await?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        dispatcher: Arc::new(JobDispatcher::new(publisher)),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state);

    // --- Serve ---
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
            tracing::info!("Received Ctrl-C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
