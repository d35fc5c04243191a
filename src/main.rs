//! Engine Gateway binary entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use engine_gateway::api::create_app;
use engine_gateway::auth::OpaqueTokenAuthenticator;
use engine_gateway::classifier::PassthroughClassifier;
use engine_gateway::config::AppConfig;
use engine_gateway::engine::{engine_binary_path, EnginePool};
use engine_gateway::gateway::GatewayState;
use engine_gateway::queue::{run_dispatcher, RequestQueue};
use engine_gateway::shutdown::{drain_pools, wait_for_signal};
use engine_gateway::types::EngineKind;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::parse();

    info!(addr = %config.addr, "starting engine gateway");

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let suggestion_binary = engine_binary_path(&config.engine_binary_dir, os, arch, EngineKind::Suggestion)
        .context("resolving suggestion engine binary")?;
    let analysis_binary = engine_binary_path(&config.engine_binary_dir, os, arch, EngineKind::Analysis)
        .context("resolving analysis engine binary")?;

    let suggestion_pool = Arc::new(
        EnginePool::init(EngineKind::Suggestion, config.suggestion_pool_size, &suggestion_binary)
            .await
            .context("starting suggestion engine pool")?,
    );
    let analysis_pool = Arc::new(
        EnginePool::init(EngineKind::Analysis, config.analysis_pool_size, &analysis_binary)
            .await
            .context("starting analysis engine pool")?,
    );

    let suggestion_queue = Arc::new(RequestQueue::new());
    let analysis_queue = Arc::new(RequestQueue::new());

    let cancel = CancellationToken::new();

    let suggestion_dispatcher = tokio::spawn(run_dispatcher(
        suggestion_queue.clone(),
        suggestion_pool.clone(),
        cancel.clone(),
    ));
    let analysis_dispatcher = tokio::spawn(run_dispatcher(
        analysis_queue.clone(),
        analysis_pool.clone(),
        cancel.clone(),
    ));

    let state = Arc::new(GatewayState::new(
        Arc::new(OpaqueTokenAuthenticator),
        suggestion_pool.clone(),
        analysis_pool.clone(),
        suggestion_queue,
        analysis_queue,
        Arc::new(PassthroughClassifier),
    ));

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.addr))?;

    info!(addr = %config.addr, "listening");

    let server_cancel = cancel.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_cancel.cancelled().await;
        info!("http server shutting down");
    });

    tokio::spawn(wait_for_signal(cancel.clone()));

    server.await.context("http server error")?;

    cancel.cancel();
    let _ = tokio::join!(suggestion_dispatcher, analysis_dispatcher);
    drain_pools(&suggestion_pool, &analysis_pool).await;

    info!("engine gateway shutdown complete");
    Ok(())
}
