//! crudkit server
//!
//! Wires configuration, storage backends, the task worker and the API router
//! into one HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ck_api::{AppState, ItemStore};
use ck_core::config::AppConfig;
use ck_db::{CursorKey, Database, MemoryItemRepository, PgItemRepository};
use ck_files::LocalStorage;
use ck_tasks::{TaskQueue, TaskWorker};

mod health;

use health::{HealthChecker, HealthConfig};

/// Simulated latency of email delivery and data processing tasks
const TASK_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        app = %config.instance.app_name,
        environment = %config.instance.environment,
        host = %config.server.host,
        port = config.server.port,
        "Starting crudkit"
    );

    let db = match Database::connect(&config.database).await {
        Ok(db) => {
            info!("Connected to database");
            Some(db)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect to database: {}. Using in-memory item storage.",
                e
            );
            None
        }
    };

    let cursor_key = match &config.pagination.cursor_secret {
        Some(secret) => CursorKey::new(secret),
        None => {
            tracing::warn!("CURSOR_SECRET not set; cursors will not survive a restart");
            CursorKey::random()
        }
    };

    let max_page_size = config.pagination.max_page_size;
    let items: ItemStore = match &db {
        Some(db) => {
            let repo = PgItemRepository::new(db.pool().clone(), max_page_size, cursor_key);
            repo.ensure_schema().await?;
            Arc::new(repo)
        }
        None => Arc::new(MemoryItemRepository::new(max_page_size).with_cursor_key(cursor_key)),
    };

    let storage = LocalStorage::new(&config.uploads.dir, config.uploads.max_upload_size);
    storage.ensure_root().await?;
    info!(dir = %storage.root().display(), "Upload storage ready");

    let (tasks, receiver) = TaskQueue::bounded(config.tasks.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = TaskWorker::with_default_handlers(receiver, TASK_DELAY);
    let worker = tokio::spawn(worker.run(shutdown_rx));

    let mut health_checker =
        HealthChecker::new(HealthConfig::default()).with_tasks(tasks.clone());
    if let Some(db) = &db {
        health_checker = health_checker.with_database(db.clone());
    }

    let max_upload_size = config.uploads.max_upload_size;
    let addr = config.server_addr();
    let state = AppState::new(config, items, Arc::new(storage), tasks);
    let app = build_router(state, Arc::new(health_checker), max_upload_size);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    if let Err(e) = worker.await {
        tracing::error!("Task worker panicked: {}", e);
    }
    if let Some(db) = db {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,ck_server=debug,ck_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Build the application router
fn build_router(state: AppState, health: Arc<HealthChecker>, max_upload_size: usize) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    Router::new()
        .merge(health_routes)
        .merge(ck_api::router(max_upload_size).with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
