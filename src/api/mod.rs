//! HTTP + WebSocket surface: router assembly (§6).

pub mod stats;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::gateway::connection::ws_handler;
use crate::gateway::GatewayState;

/// Assemble the full application router: WebSocket upgrade, stats, health.
pub fn create_app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/stats", get(stats::stats_handler))
        .route("/healthz", get(stats::healthz_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
