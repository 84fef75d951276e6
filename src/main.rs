mod admission;
mod config;
mod error;
mod handlers;
mod models;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get},
};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    admission::{AdmissionController, spawn_reset_task},
    config::Config,
    handlers::{health, submit},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = Arc::new(Config::from_env()?);
    let admission = Arc::new(AdmissionController::new(
        cfg.quota_limit_bytes,
        cfg.rate_limit_per_window,
    ));

    let shutdown = CancellationToken::new();
    let reset_task = spawn_reset_task(admission.clone(), cfg.rate_window(), shutdown.clone());

    let app = router(AppState {
        cfg: cfg.clone(),
        admission,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(err) = reset_task.await {
        error!("reset task ended abnormally: {err}");
    }

    Ok(())
}

fn router(state: AppState) -> Router {
    let body_limit = match state.cfg.max_body_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };
    Router::new()
        .route("/health", get(health))
        // Method is checked in the handler so non-POST gets the plain-text 405.
        .route("/data", any(submit).layer(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    shutdown.cancel();
}
