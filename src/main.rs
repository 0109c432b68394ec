//! eviction-webhook - admission webhook that protects server pods from eviction.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration and the policy rules
//! - Starts the TLS webhook server and, if configured, the metrics server
//! - Shuts down gracefully on SIGTERM/SIGINT

use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use tokio::signal;
use tracing::{error, info};

use eviction_webhook::metrics::run_metrics_server;
use eviction_webhook::{Metrics, WebhookConfig, WebhookError, WebhookState, run_webhook_server};

/// Grace period for in-flight reviews to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eviction_webhook=info".parse()?)
                .add_directive("audit=info".parse()?),
        )
        .json()
        .init();

    info!("Starting eviction-webhook");

    // axum-server and rustls must agree on one process-wide provider
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    let config = WebhookConfig::from_env().map_err(WebhookError::from)?;
    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(WebhookState::from_config(&config, metrics.clone())?);
    info!(
        port = config.port,
        cert_path = %config.cert_path.display(),
        key_path = %config.key_path.display(),
        rules = state.policies.rules().len(),
        policy_file = ?config.policy_file,
        "Configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(metrics, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let handle = Handle::new();
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!(
                "Received shutdown signal, waiting up to {}s for in-flight reviews",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)));
        });
    }

    if let Err(e) = run_webhook_server(&config, state, handle).await {
        error!("Webhook server error: {}", e);
        return Err(e.into());
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the server cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
