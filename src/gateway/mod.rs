//! Gateway (§4.4): WebSocket connection lifecycle — auth handshake, routing,
//! heartbeat, disconnect cleanup.

pub mod connection;
pub mod protocol;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use crate::auth::Authenticator;
use crate::classifier::SuggestionClassifier;
use crate::engine::EnginePool;
use crate::handlers::{AnalysisArtifact, AnalysisHandler, SuggestionArtifact, SuggestionHandler};
use crate::queue::RequestQueue;
use crate::types::ConnectionId;

/// A registered, authenticated connection. Handlers hold this (not the raw
/// socket) and must check `alive`/`sender` before writing, per §3's "weak
/// reference" ownership rule.
pub struct ConnectionHandle {
    pub email: String,
    pub sender: mpsc::UnboundedSender<Message>,
    /// Flipped to `false` at each heartbeat tick, back to `true` on pong.
    pub heartbeat_alive: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Shared state behind the Gateway's connection registry — mirrors the
/// teacher's `Arc<RwLock<Inner>>` shape (`api/setup.rs::SetupState`).
pub struct GatewayState {
    pub connections: RwLock<HashMap<String, ConnectionHandle>>,
    pub total_connections: AtomicU64,
    pub next_connection_id: AtomicU64,
    pub authenticator: Arc<dyn Authenticator>,
    pub suggestion_pool: Arc<EnginePool>,
    pub analysis_pool: Arc<EnginePool>,
    pub suggestion_queue: Arc<RequestQueue<SuggestionArtifact>>,
    pub analysis_queue: Arc<RequestQueue<AnalysisArtifact>>,
    pub suggestion_handler: SuggestionHandler,
    pub analysis_handler: AnalysisHandler,
}

impl GatewayState {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        suggestion_pool: Arc<EnginePool>,
        analysis_pool: Arc<EnginePool>,
        suggestion_queue: Arc<RequestQueue<SuggestionArtifact>>,
        analysis_queue: Arc<RequestQueue<AnalysisArtifact>>,
        classifier: Arc<dyn SuggestionClassifier>,
    ) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            total_connections: AtomicU64::new(0),
            next_connection_id: AtomicU64::new(0),
            authenticator,
            suggestion_pool,
            analysis_pool,
            suggestion_queue,
            analysis_queue,
            suggestion_handler: SuggestionHandler::new(classifier),
            analysis_handler: AnalysisHandler,
        }
    }

    pub async fn register(&self, user_id: String, handle: ConnectionHandle) {
        self.connections.write().await.insert(user_id, handle);
    }

    pub async fn unregister(&self, user_id: &str) {
        self.connections.write().await.remove(user_id);
        self.suggestion_queue.cancel_for_user(user_id).await;
        self.analysis_queue.cancel_for_user(user_id).await;
    }

    pub async fn is_open(&self, user_id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(user_id)
            .is_some_and(ConnectionHandle::is_open)
    }

    /// Count one socket in and hand back a guard that counts it back out on
    /// drop, however `handle_socket` exits — auth timeout, rejected token,
    /// or a normal close after `route_messages` returns. Mirrors the
    /// teacher's `ProcessLock`/`Drop` release pattern (`storage::lockfile`)
    /// so the counter can't be left unbalanced by a future early return.
    pub fn connect(self: &Arc<Self>) -> ConnectionGuard {
        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            id,
            state: Arc::clone(self),
        }
    }
}

/// Counts a connection in `GatewayState::connect` and back out on drop.
/// Holding this for the lifetime of `handle_socket` is what keeps
/// `total_connections` balanced across every exit path, not just the one
/// that reaches `route_messages`.
pub struct ConnectionGuard {
    id: ConnectionId,
    state: Arc<GatewayState>,
}

impl ConnectionGuard {
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.total_connections.fetch_sub(1, Ordering::Relaxed);
    }
}
