//! sidecar-injector - A mutating admission webhook for sidecar injection.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration from the environment
//! - Starts the health server and the TLS webhook server
//! - Shuts down gracefully on SIGTERM/SIGINT

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};

use sidecar_injector::health::{HealthState, run_health_server};
use sidecar_injector::templates::HttpTemplateStore;
use sidecar_injector::{Error, InjectorConfig, WebhookState, run_webhook_server};

/// Grace period for in-flight admission reviews to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sidecar_injector=info".parse()?),
        )
        .json()
        .init();

    info!("Starting sidecar-injector");

    // Both axum-server and reqwest link rustls; pick the provider explicitly
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = InjectorConfig::from_env()?;
    info!(
        template_url = %config.template_url,
        fetch_timeout = ?config.fetch_timeout,
        fail_open = config.fail_open,
        "Loaded configuration"
    );

    let store = HttpTemplateStore::new(&config.template_url, config.fetch_timeout)
        .map_err(Error::from)?;

    let health_state = Arc::new(HealthState::new());

    // Probes should answer before the webhook is up
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let webhook_state = Arc::new(
        WebhookState::new(Arc::new(store), config.fail_open)
            .with_health_state(health_state.clone()),
    );

    let webhook_handle = {
        let config = config.clone();
        tokio::spawn(async move { run_webhook_server(webhook_state, &config).await })
    };
    health_state.set_ready(true).await;

    tokio::select! {
        result = webhook_handle => {
            match result {
                Ok(Ok(())) => info!("Webhook server exited"),
                Ok(Err(e)) => {
                    error!("Webhook server error: {}", e);
                    return Err(e.into());
                }
                Err(e) => error!("Webhook server task panicked: {}", e),
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission reviews
            health_state.set_ready(false).await;

            info!(
                "Waiting {}s for in-flight admission reviews to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;
        }
    }

    info!("sidecar-injector stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Signal handler setup failures are fatal.
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
