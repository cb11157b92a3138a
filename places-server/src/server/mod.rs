mod handlers;
mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use places_core::{Aggregator, ServerConfig};
use state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API routes plus the static front end as fallback.
///
/// `request_timeout` bounds each request end to end; when it fires the
/// handler future is dropped, which cancels every provider call in flight.
pub fn build_router(aggregator: Aggregator, static_dir: &Path, request_timeout: Duration) -> Router {
    let state = AppState { aggregator: Arc::new(aggregator) };

    Router::new()
        .route("/api/search", post(handlers::search))
        .route("/api/location/details", post(handlers::location_details))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(config: &ServerConfig, aggregator: Aggregator) -> anyhow::Result<()> {
    let app = build_router(
        aggregator,
        &config.static_dir,
        Duration::from_secs(config.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;

    info!(static_dir = %config.static_dir.display(), "places server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
