//! Router construction and server lifecycle

use crate::config::ServerConfig;
use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use blaze_sandbox::BuildService;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BuildService>,
}

impl AppState {
    pub fn new(service: BuildService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Create the playground router
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/build", post(routes::build::build))
        .route("/run", post(routes::run::run))
        .route("/transpile", post(routes::transpile::transpile))
        .route("/health", get(routes::health::health_check))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// The scratch directory is created and probed first; the server refuses
/// to start without a writable one.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let service = config.build_service();
    service
        .store()
        .ensure_ready()
        .await
        .with_context(|| {
            format!(
                "Scratch directory {} is not usable",
                config.scratch_dir.display()
            )
        })?;

    let app = create_router(AppState::new(service), config.max_body_bytes);

    let bind_addr = listener
        .local_addr()
        .context("Failed to obtain server bind address")?;
    info!(
        compiler = %config.compiler.display(),
        scratch_dir = %config.scratch_dir.display(),
        "Starting Blaze playground server on {}",
        bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

/// Bind `config.bind_addr` and serve until Ctrl-C or SIGTERM.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    serve(listener, &config, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
