//! `api` crate — HTTP REST entry point.
//!
//! Exposes:
//!   POST /api/v1/execute          — run a catalog workflow with a query
//!   GET  /api/v1/workflows        — list catalog workflows
//!   GET  /api/v1/workflows/{name} — fetch one workflow definition
//!   GET  /api/v1/actions          — list declared action schemas
//!
//! The execute endpoint returns the engine's execution report verbatim; a
//! missing or unknown workflow name (or an empty query) is a client error.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::{ActionRegistry, Executor};

pub mod handlers;

pub use handlers::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/execute", post(handlers::executions::execute))
        .route("/api/v1/workflows", get(handlers::workflows::list))
        .route("/api/v1/workflows/:name", get(handlers::workflows::get))
        .route("/api/v1/actions", get(handlers::actions::list))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(bind: &str, registry: Arc<ActionRegistry>) -> anyhow::Result<()> {
    let state = AppState {
        executor: Arc::new(Executor::new(registry)),
    };
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API server listening on {bind}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
