//! Carsync Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use carsync_common::logging::{init_logging, LogConfig};
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use tokio::signal;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tracing::{error, info, warn};

use carsync_server::{
    config::Config,
    db, features, middleware,
    sync::{SyncConfig, SyncScheduler},
    AppError,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("carsync-server".to_string())
        .filter_directives("carsync_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting carsync server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    // Shutdown channel shared by the server and the sync scheduler; the
    // reconciler checks it at batch boundaries.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the sync scheduler if enabled
    let scheduler_handle = match SyncConfig::from_env() {
        Ok(sync_config) if sync_config.enabled => {
            match SyncScheduler::new(sync_config, pool.clone()) {
                Ok(scheduler) => {
                    info!("Sync is enabled, starting scheduler");
                    Some(scheduler.start(shutdown_rx.clone()))
                }
                Err(e) => {
                    error!("Failed to start sync scheduler: {}", e);
                    None
                }
            }
        }
        Ok(_) => {
            info!("Sync is disabled (SYNC_ENABLED=false)");
            None
        }
        Err(e) => {
            warn!("Sync configuration invalid, scheduler not started: {}", e);
            None
        }
    };

    // Build the application router
    let app = create_router(pool, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scheduler; a cycle in flight finishes its current batch first
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler_handle {
        let timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_secs);
        if tokio::time::timeout(timeout, handle).await.is_err() {
            warn!("Sync scheduler did not stop within {:?}", timeout);
        }
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(pool: PgPool, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .with_state(pool.clone())
        .nest("/api/v1", features::router(pool))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(pool): State<PgPool>) -> Result<Response, StatusCode> {
    match sqlx::query("SELECT 1").fetch_one(&pool).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Get catalog statistics
async fn get_stats(State(pool): State<PgPool>) -> Result<Response, AppError> {
    let makes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM makes").fetch_one(&pool);
    let models = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM car_models").fetch_one(&pool);
    let vehicles = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles").fetch_one(&pool);

    let (makes, models, vehicles) = tokio::try_join!(makes, models, vehicles)?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "makes": makes,
            "models": models,
            "vehicles": vehicles
        })),
    )
        .into_response())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
