//! Prometheus metrics for the callback harness.
//!
//! All metrics follow the naming convention: `harness_<component>_<metric>_total`
//! and carry a `role` label where they are per role.

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Webhooks accepted by a role's receiver
    pub static ref CALLBACKS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("harness_receiver_callbacks_received_total", "Callbacks accepted per role and type"),
        &["role", "kind"]
    ).expect("metric creation failed");

    /// Webhooks answered with 400
    pub static ref CALLBACKS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("harness_receiver_callbacks_rejected_total", "Callbacks rejected per role and reason"),
        &["role", "reason"]
    ).expect("metric creation failed");

    /// Listener and tap deliveries made by a role stream
    pub static ref EVENTS_DELIVERED: CounterVec = CounterVec::new(
        Opts::new("harness_bus_events_delivered_total", "Listener and tap deliveries per role"),
        &["role"]
    ).expect("metric creation failed");

    /// Listeners that panicked during dispatch
    pub static ref LISTENER_PANICS: CounterVec = CounterVec::new(
        Opts::new("harness_bus_listener_panics_total", "Listeners that panicked while handling an event"),
        &["role"]
    ).expect("metric creation failed");

    /// Correlator outcomes
    pub static ref CORRELATORS_SETTLED: CounterVec = CounterVec::new(
        Opts::new("harness_correlators_settled_total", "Correlators settled per role and outcome"),
        &["role", "outcome"]  // outcome: resolved/rejected
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics that are already registered are
/// left as they are.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CALLBACKS_RECEIVED.clone()),
        Box::new(CALLBACKS_REJECTED.clone()),
        Box::new(EVENTS_DELIVERED.clone()),
        Box::new(LISTENER_PANICS.clone()),
        Box::new(CORRELATORS_SETTLED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Count an accepted callback. `kind` must come from a closed set (map
/// unknown callback types to `"other"`), since every value is a new series.
pub fn record_callback_received(role: &str, kind: &str) {
    CALLBACKS_RECEIVED.with_label_values(&[role, kind]).inc();
}

/// Count a rejected callback.
pub fn record_callback_rejected(role: &str, reason: &str) {
    CALLBACKS_REJECTED.with_label_values(&[role, reason]).inc();
}

pub fn record_events_delivered(role: &str, deliveries: usize) {
    if deliveries > 0 {
        EVENTS_DELIVERED
            .with_label_values(&[role])
            .inc_by(deliveries as f64);
    }
}

pub fn record_listener_panicked(role: &str) {
    LISTENER_PANICS.with_label_values(&[role]).inc();
}

/// Count a settled correlator. `resolved == false` means rejected.
pub fn record_correlator_settled(role: &str, resolved: bool) {
    let outcome = if resolved { "resolved" } else { "rejected" };
    CORRELATORS_SETTLED.with_label_values(&[role, outcome]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn gather_text() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
