//! HTTP server for metrics and health probes
//!
//! - `/metrics`: Prometheus text exposition
//! - `/healthz`: liveness, always OK while the process serves requests
//! - `/readyz`: OK once the controller watch loop has started

use crate::context::cancellation_requested;
use crate::error::ControllerError;
use crate::observability::ControllerMetrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state of the probe server
#[derive(Debug, Clone)]
pub struct ServerState {
    metrics: Arc<ControllerMetrics>,
    ready: Arc<AtomicBool>,
}

impl ServerState {
    pub fn new(metrics: Arc<ControllerMetrics>) -> Self {
        Self {
            metrics,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

/// Routes of the probe server
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves [`router`] on `port` until `shutdown` flips to `true`
pub async fn start_server(port: u16, state: ServerState, shutdown: watch::Receiver<bool>) -> Result<(), ControllerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::Server(format!("Failed to bind {addr}: {e}")))?;
    info!("Metrics and probe server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancellation_requested(shutdown))
        .await
        .map_err(|e| ControllerError::Server(e.to_string()))
}

async fn metrics(State(state): State<ServerState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<ServerState>) -> (StatusCode, &'static str) {
    if state.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
