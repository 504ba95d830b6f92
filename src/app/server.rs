//! HTTP server for the menu API.

use crate::app::handlers;
use crate::config::ServerConfig;
use crate::core::engine::MenuEngine;
use crate::utils::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MenuEngine>,
}

impl AppState {
    pub fn new(engine: Arc<MenuEngine>) -> Self {
        Self { engine }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/parseMenu", post(handlers::parse_menu))
        .route("/api/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 啟動 HTTP 服務，收到 Ctrl-C 後優雅關閉
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Menu API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Menu API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
