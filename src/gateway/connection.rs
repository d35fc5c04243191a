//! Per-connection task: auth handshake, heartbeat, message routing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::protocol::{AuthedUser, Inbound, Outbound};
use super::{ConnectionHandle, GatewayState};
use crate::api::stats::snapshot;
use crate::types::ConnectionState;

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn to_message(outbound: &Outbound) -> Message {
    Message::Text(serde_json::to_string(outbound).unwrap_or_default())
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Counts this socket in now, pre-authentication, and back out on drop
    // regardless of which branch below returns (§3 added: `ConnectionId`).
    let _connection_guard = state.connect();
    debug!(id = _connection_guard.id().get(), state = ?ConnectionState::AwaitingAuth, "socket upgraded");

    let auth_outcome = tokio::time::timeout(AUTH_TIMEOUT, await_auth_frame(&mut ws_rx, &out_tx)).await;

    let token = match auth_outcome {
        Err(_) => {
            let _ = out_tx.send(close_frame(4001, "auth timeout"));
            finish(writer, state).await;
            return;
        }
        Ok(None) => {
            let _ = out_tx.send(close_frame(4002, "no token"));
            finish(writer, state).await;
            return;
        }
        Ok(Some(ref token)) if token.trim().is_empty() => {
            let _ = out_tx.send(close_frame(4002, "no token"));
            finish(writer, state).await;
            return;
        }
        Ok(Some(token)) => token,
    };

    let identity = match state.authenticator.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            let _ = out_tx.send(to_message(&Outbound::AuthError {
                error: e.to_string(),
            }));
            let _ = out_tx.send(close_frame(4003, "invalid token"));
            finish(writer, state).await;
            return;
        }
    };

    let heartbeat_alive = Arc::new(AtomicBool::new(true));
    state
        .register(
            identity.user_id.clone(),
            ConnectionHandle {
                email: identity.email.clone(),
                sender: out_tx.clone(),
                heartbeat_alive: heartbeat_alive.clone(),
            },
        )
        .await;

    let _ = out_tx.send(to_message(&Outbound::AuthSuccess {
        user: AuthedUser {
            id: identity.user_id.clone(),
            email: identity.email.clone(),
        },
    }));
    info!(user_id = %identity.user_id, state = ?ConnectionState::Authenticated, "connection authenticated");

    route_messages(&mut ws_rx, &out_tx, &state, &identity.user_id, &heartbeat_alive).await;

    state.unregister(&identity.user_id).await;
    info!(user_id = %identity.user_id, state = ?ConnectionState::Closed, "connection closed");
    finish(writer, state).await;
    // `_connection_guard` drops here, decrementing `total_connections`
    // exactly once no matter which branch above returned first.
}

async fn finish(writer: tokio::task::JoinHandle<()>, state: Arc<GatewayState>) {
    let _ = state; // keep Arc alive until the writer drains
    writer.abort();
}

/// Wait for the first frame; it must be `{type:"auth", token}`. Any other
/// frame before auth is rejected with an error frame but does not close the
/// connection (§4.4). Returns `None` if the socket closed first.
async fn await_auth_frame(
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    out_tx: &mpsc::UnboundedSender<Message>,
) -> Option<String> {
    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<Inbound>(&text) {
                Ok(Inbound::Auth { token }) => return Some(token),
                Ok(_) => {
                    let _ = out_tx.send(to_message(&Outbound::Error {
                        error: "must authenticate before sending other messages".into(),
                    }));
                }
                Err(_) => {
                    let _ = out_tx.send(to_message(&Outbound::Error {
                        error: "malformed JSON".into(),
                    }));
                }
            },
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "websocket read error during auth");
                return None;
            }
        }
    }
}

async fn route_messages(
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    out_tx: &mpsc::UnboundedSender<Message>,
    state: &Arc<GatewayState>,
    user_id: &str,
    heartbeat_alive: &Arc<AtomicBool>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&text, out_tx, state, user_id).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        heartbeat_alive.store(true, Ordering::SeqCst);
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read error");
                        return;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if !heartbeat_alive.swap(false, Ordering::SeqCst) {
                    warn!(user_id, "heartbeat missed, terminating connection");
                    return;
                }
                if out_tx.send(Message::Ping(Vec::new())).is_err() {
                    return;
                }
            }
        }
    }
}

async fn handle_text_frame(
    text: &str,
    out_tx: &mpsc::UnboundedSender<Message>,
    state: &Arc<GatewayState>,
    user_id: &str,
) {
    let inbound = match serde_json::from_str::<Inbound>(text) {
        Ok(inbound) => inbound,
        Err(_) => {
            let _ = out_tx.send(to_message(&Outbound::Error {
                error: "malformed JSON or unknown message type".into(),
            }));
            return;
        }
    };

    match inbound {
        Inbound::Auth { .. } => {
            let _ = out_tx.send(to_message(&Outbound::Error {
                error: "already authenticated".into(),
            }));
        }
        Inbound::Suggestion(req) => {
            let request_id = req.request_id.clone();
            match state
                .suggestion_handler
                .handle(req, user_id.to_string(), &state.suggestion_queue)
                .await
            {
                Ok(rx) => spawn_suggestion_reply(rx, request_id, out_tx.clone(), state.clone(), user_id.to_string()),
                Err(e) => {
                    let _ = out_tx.send(to_message(&Outbound::SuggestionError {
                        request_id,
                        error: e.to_string(),
                    }));
                }
            }
        }
        Inbound::Analyze(req) => {
            let request_id = req.request_id.clone();
            match state
                .analysis_handler
                .handle(req, user_id.to_string(), &state.analysis_queue)
                .await
            {
                Ok(rx) => spawn_analysis_reply(rx, request_id, out_tx.clone(), state.clone(), user_id.to_string()),
                Err(e) => {
                    let _ = out_tx.send(to_message(&Outbound::AnalysisError {
                        request_id,
                        error: e.to_string(),
                    }));
                }
            }
        }
        Inbound::Stats => {
            let snap = snapshot(state).await;
            let _ = out_tx.send(to_message(&Outbound::Stats(snap)));
        }
    }
}

fn spawn_suggestion_reply(
    rx: tokio::sync::oneshot::Receiver<Result<crate::handlers::SuggestionArtifact, crate::engine::EngineError>>,
    request_id: String,
    out_tx: mpsc::UnboundedSender<Message>,
    state: Arc<GatewayState>,
    user_id: String,
) {
    tokio::spawn(async move {
        let Ok(result) = rx.await else {
            // Superseded or cancelled: silent drop, nothing to send (§4.3, §7).
            return;
        };
        if !state.is_open(&user_id).await {
            return;
        }
        let outbound = match result {
            Ok(artifact) => Outbound::SuggestionResult {
                request_id,
                fen: artifact.fen,
                suggestions: artifact.suggestions.into_iter().map(Into::into).collect(),
                position_eval: artifact.position_eval,
                mate_in: artifact.mate_in,
                win_rate: artifact.win_rate,
                max_depth: artifact.max_depth,
            },
            Err(e) => Outbound::SuggestionError {
                request_id,
                error: e.to_string(),
            },
        };
        let _ = out_tx.send(to_message(&outbound));
    });
}

fn spawn_analysis_reply(
    rx: tokio::sync::oneshot::Receiver<Result<crate::handlers::AnalysisArtifact, crate::engine::EngineError>>,
    request_id: String,
    out_tx: mpsc::UnboundedSender<Message>,
    state: Arc<GatewayState>,
    user_id: String,
) {
    tokio::spawn(async move {
        let Ok(result) = rx.await else {
            return;
        };
        if !state.is_open(&user_id).await {
            return;
        }
        let outbound = match result {
            Ok(artifact) => Outbound::AnalysisResult { request_id, artifact },
            Err(e) => Outbound::AnalysisError {
                request_id,
                error: e.to_string(),
            },
        };
        let _ = out_tx.send(to_message(&outbound));
    });
}
