//! Router assembly tests: the stats/health endpoints respond without
//! needing a live WebSocket connection or a running engine subprocess.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use engine_gateway::api::create_app;
use engine_gateway::auth::OpaqueTokenAuthenticator;
use engine_gateway::classifier::PassthroughClassifier;
use engine_gateway::engine::EnginePool;
use engine_gateway::gateway::GatewayState;
use engine_gateway::queue::RequestQueue;
use engine_gateway::types::EngineKind;
use tower::ServiceExt;

async fn empty_state() -> Arc<GatewayState> {
    // Pools with zero engines: never acquired by these tests, just needed to
    // construct a `GatewayState` without spawning a real subprocess.
    let suggestion_pool = Arc::new(
        EnginePool::init(EngineKind::Suggestion, 0, &std::path::PathBuf::from("./engines"))
            .await
            .expect("zero-engine pool always starts"),
    );
    let analysis_pool = Arc::new(
        EnginePool::init(EngineKind::Analysis, 0, &std::path::PathBuf::from("./engines"))
            .await
            .expect("zero-engine pool always starts"),
    );

    Arc::new(GatewayState::new(
        Arc::new(OpaqueTokenAuthenticator),
        suggestion_pool,
        analysis_pool,
        Arc::new(RequestQueue::new()),
        Arc::new(RequestQueue::new()),
        Arc::new(PassthroughClassifier),
    ))
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = create_app(empty_state().await);
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn stats_returns_zeroed_snapshot() {
    let app = create_app(empty_state().await);
    let response = app
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
