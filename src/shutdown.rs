//! Shutdown coordinator: stop accepting new work and drain running engines,
//! triggered by SIGINT/SIGTERM (mirrors the teacher's `CancellationToken`
//! pattern in `main.rs`, extended to listen for `SIGTERM` as well as
//! `ctrl_c` since this runs as a long-lived service, not an interactive CLI).

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::EnginePool;

/// Wait for SIGINT or SIGTERM, then cancel `token` so dispatcher loops and
/// the HTTP server stop accepting new work.
pub async fn wait_for_signal(token: CancellationToken) {
    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        _ = term.recv() => info!("received SIGTERM, shutting down"),
    }
    token.cancel();
}

/// Drain both engine pools once dispatchers have stopped pulling new work.
pub async fn drain_pools(suggestion_pool: &EnginePool, analysis_pool: &EnginePool) {
    info!("draining engine pools");
    suggestion_pool.shutdown().await;
    analysis_pool.shutdown().await;
    info!("engine pools drained");
}
