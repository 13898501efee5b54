//! # Callback Harness Runtime
//!
//! Process wiring around [`CallbackHarness`]:
//!
//! 1. Load configuration (`HARNESS_CONFIG` file or defaults)
//! 2. Apply `HARNESS_*` environment overrides and validate
//! 3. Start one receiver per available role
//! 4. Tap every role stream and log each delivery
//! 5. On shutdown, stop the taps, then the receivers

use anyhow::{Context, Result};
use callback_bus::{CallbackFilter, RoleStreams};
use callback_receiver::{CallbackHarness, HarnessConfig};
use harness_telemetry::log_callback;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Environment variable naming a TOML configuration file.
pub const CONFIG_ENV: &str = "HARNESS_CONFIG";

/// Build the harness configuration from a variable lookup.
pub fn load_config(lookup: impl Fn(&str) -> Option<String>) -> Result<HarnessConfig> {
    let mut config = match lookup(CONFIG_ENV) {
        Some(path) => HarnessConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => HarnessConfig::default(),
    };

    config
        .apply_env_from(&lookup)
        .context("invalid environment override")?;
    config.validate().context("invalid harness configuration")?;

    Ok(config)
}

/// Spawn one delivery-logging tap per role. Each task returns how many
/// deliveries it logged once `shutdown` flips to `true`.
pub fn spawn_delivery_log(
    streams: &RoleStreams,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<u64>> {
    streams
        .roles()
        .filter_map(|role| streams.get(role))
        .map(|stream| {
            let mut subscription = stream.subscribe(CallbackFilter::all());
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut logged = 0u64;
                loop {
                    tokio::select! {
                        event = subscription.recv() => match event {
                            Some(event) => {
                                logged += 1;
                                log_callback!(info, event, seq = logged, "Delivery");
                            }
                            None => break,
                        },
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!(role = %subscription.role(), logged = logged, "Delivery log stopped");
                logged
            })
        })
        .collect()
}

/// Log where every available role listens.
pub fn announce(harness: &CallbackHarness) {
    for role in harness.roles() {
        if let Ok(url) = harness.callback_url(role) {
            info!(role = %role, url = %url, "Callback endpoint ready");
        }
    }
    for role in &harness.config().roles {
        if !role.available {
            info!(role = %role.role, "Role unavailable, no endpoint started");
        }
    }
}
