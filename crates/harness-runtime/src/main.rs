//! `callback-harness` - run the role callback endpoints standalone.

use std::env;

use anyhow::{Context, Result};
use callback_receiver::CallbackHarness;
use harness_runtime::{announce, load_config, spawn_delivery_log};
use harness_telemetry::{gather_text, init_telemetry, TelemetryConfig};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and metrics
    let telemetry = TelemetryConfig::from_env();
    let _telemetry_guard = init_telemetry(&telemetry).context("failed to initialise telemetry")?;

    // Load configuration
    let config = load_config(|key| env::var(key).ok())?;

    let harness = CallbackHarness::start(config)
        .await
        .context("failed to start callback receivers")?;
    announce(&harness);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let taps = spawn_delivery_log(harness.streams(), shutdown_rx);

    info!("Callback harness is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    // Graceful shutdown
    let _ = shutdown_tx.send(true);
    let mut delivered = 0;
    for tap in taps {
        match tap.await {
            Ok(logged) => delivered += logged,
            Err(e) => warn!(error = %e, "Delivery log task failed"),
        }
    }
    info!(delivered = delivered, "Stopping callback harness");

    if let Ok(metrics) = gather_text() {
        debug!(metrics = %metrics, "Final metrics");
    }

    harness
        .shutdown()
        .await
        .context("failed to stop callback receivers")?;

    Ok(())
}
