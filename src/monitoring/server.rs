use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::metrics::BotMetrics;
use crate::errors::{BotError, Result};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// HTTP server exposing `/metrics` and `/health`
pub struct MetricsServer {
    addr: SocketAddr,
    metrics: Arc<BotMetrics>,
}

impl MetricsServer {
    pub fn new(addr: SocketAddr, metrics: Arc<BotMetrics>) -> Self {
        Self { addr, metrics }
    }

    pub fn router(metrics: Arc<BotMetrics>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(metrics)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| BotError::config(format!("Cannot bind metrics server to {}: {}", self.addr, e)))?;

        info!("📊 Metrics server listening on http://{}", self.addr);
        info!("  - Metrics: http://{}/metrics", self.addr);
        info!("  - Health: http://{}/health", self.addr);

        axum::serve(listener, Self::router(self.metrics))
            .await
            .map_err(|e| BotError::internal(format!("Metrics server failed: {}", e)))
    }
}

async fn metrics_handler(State(metrics): State<Arc<BotMetrics>>) -> std::result::Result<String, StatusCode> {
    metrics.render().map_err(|e| {
        error!("Failed to render metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
