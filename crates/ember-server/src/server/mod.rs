//! HTTP server for text generation

mod error;
mod extract;
mod handlers;
mod routes;
pub mod schemas;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use ember_ai::ModelManager;
use ember_core::config::ServerConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use extract::ValidJson;
pub use handlers::{AppState, ENGINE_NAME};
pub use routes::api_routes;

/// Router with tracing and permissive CORS (the browser front end calls
/// the API cross-origin).
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Kick off the boot-time model load. Failure is logged and the process
/// keeps serving; `/health` reports the failed state.
pub fn spawn_startup_load(manager: Arc<ModelManager>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = manager.load().await {
            tracing::warn!("Model failed to load at startup, serving without it: {e}");
        }
    })
}

/// Start the HTTP server
pub async fn start(manager: Arc<ModelManager>, config: ServerConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    spawn_startup_load(manager.clone());

    let app = build_router(Arc::new(AppState::new(manager)));

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  POST /generate - Text generation");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
