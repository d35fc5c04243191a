//! Stats endpoint (§4.8): a point-in-time snapshot of gateway occupancy,
//! served over HTTP and as a WebSocket convenience message.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::engine::PoolStats;
use crate::gateway::GatewayState;
use crate::queue::QueueStats;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    #[serde(rename = "totalConnections")]
    pub total_connections: u64,
    #[serde(rename = "authenticatedUsers")]
    pub authenticated_users: usize,
    #[serde(rename = "suggestionQueue")]
    pub suggestion_queue: QueueStats,
    #[serde(rename = "analysisQueue")]
    pub analysis_queue: QueueStats,
    #[serde(rename = "suggestionPool")]
    pub suggestion_pool: PoolStats,
    #[serde(rename = "analysisPool")]
    pub analysis_pool: PoolStats,
}

pub async fn snapshot(state: &GatewayState) -> StatsSnapshot {
    StatsSnapshot {
        total_connections: state.total_connections.load(Ordering::Relaxed),
        authenticated_users: state.connections.read().await.len(),
        suggestion_queue: state.suggestion_queue.stats().await,
        analysis_queue: state.analysis_queue.stats().await,
        suggestion_pool: state.suggestion_pool.stats().await,
        analysis_pool: state.analysis_pool.stats().await,
    }
}

pub async fn stats_handler(State(state): State<Arc<GatewayState>>) -> Json<StatsSnapshot> {
    Json(snapshot(&state).await)
}

pub async fn healthz_handler() -> &'static str {
    "ok"
}
