mod config;
mod error;
mod handlers;
mod models;
mod network;
mod static_files;
mod storage;
mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::storage::FileStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
    pub config: Arc<Config>,
    pub local_ip: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting filedrop...");

    // Load configuration
    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded");

    // Open file store
    let store = Arc::new(FileStore::open(&config.storage.dir).await?);
    tracing::info!("Storing uploads in {:?}", store.dir());

    if config.storage.clear_on_startup {
        if let Err(e) = store.clear_all().await {
            tracing::warn!("Failed to clear files on startup: {}", e);
        }
    }

    // Start expiry sweeper
    let sweeper_token = CancellationToken::new();
    let sweeper = storage::spawn_expiry_sweeper(
        store.clone(),
        config.storage.sweep_interval(),
        sweeper_token.clone(),
    );

    let local_ip = network::detect_local_ip();

    let state = AppState {
        store: store.clone(),
        config: config.clone(),
        local_ip: local_ip.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Local access:   http://localhost:{}", config.server.port);
    tracing::info!("Network access: http://{}:{}", local_ip, config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down server...");

    sweeper_token.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!("Expiry sweeper task failed: {}", e);
    }

    if config.storage.clear_on_shutdown {
        if let Err(e) = store.clear_all().await {
            tracing::warn!("Failed to clear files on shutdown: {}", e);
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

pub(crate) fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/info", get(handlers::info::get_info))
        .route("/api/upload", post(handlers::file::upload_file))
        .route("/api/files", get(handlers::file::list_files))
        .route("/api/download/:id", get(handlers::file::download_file))
        .route("/api/delete/:id", delete(handlers::file::delete_file))
        .layer(DefaultBodyLimit::max(state.config.upload.max_size_bytes()));

    api_routes
        .fallback_service(static_files::static_service(&state.config.server.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
