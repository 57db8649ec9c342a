//! HelloWorld Controller
//!
//! Converges every HelloWorld resource into a single busybox Pod that echoes
//! the requested message, and reports progress through status conditions:
//! - Ready: the Pod is running
//! - Progressing: the Pod is being created or is starting
//! - Degraded: the Pod failed or could not be created
//!
//! An image pull secret is copied into each HelloWorld namespace before the
//! Pod is created. Metrics and health probes are served over HTTP.

mod backoff;
mod builder;
mod conditions;
mod config;
mod context;
mod controller;
mod error;
mod observability;
mod provisioner;
mod reconciler;
mod server;
#[cfg(test)]
mod test_utils;

use anyhow::Context as _;
use config::ControllerConfig;
use observability::{ControllerMetrics, ReconcileObserver};
use server::ServerState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "hello_world_controller=info,kube=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting HelloWorld Controller");

    let config = ControllerConfig::from_env().context("Invalid controller configuration")?;
    info!("Configuration:");
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Metrics port: {}", config.metrics_port);
    info!(
        "  Pull secret: {} (from {})",
        config.pull_secret_name, config.pull_secret_source_namespace
    );
    info!("  Request timeout: {}s", config.request_timeout.as_secs());
    info!("  Requeue after: {}s", config.requeue_after.as_secs());
    info!(
        "  Error backoff: {}s..{}s",
        config.backoff_min_secs, config.backoff_max_secs
    );

    let metrics = Arc::new(ControllerMetrics::new().context("Failed to register metrics")?);
    let observer: Arc<dyn ReconcileObserver> = metrics.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_state = ServerState::new(metrics);
    let server = tokio::spawn({
        let state = server_state.clone();
        let shutdown = shutdown_rx.clone();
        let port = config.metrics_port;
        async move {
            if let Err(e) = server::start_server(port, state, shutdown).await {
                error!("Metrics server failed: {}", e);
            }
        }
    });

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, cancelling in-flight reconciliations");
        let _ = shutdown_tx.send(true);
    });

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let ready = server_state.clone();
    controller::run(client, &config, observer, shutdown_rx, move || ready.set_ready(true)).await?;
    server_state.set_ready(false);

    if let Err(e) = server.await {
        error!("Metrics server task panicked: {}", e);
    }
    info!("HelloWorld Controller stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
