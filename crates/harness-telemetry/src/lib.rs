//! # Harness Telemetry
//!
//! Logging and metrics shared by the receivers, the correlators and the
//! `callback-harness` binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use harness_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `callback-harness` | Service name in the startup log |
//! | `HARNESS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `HARNESS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `HARNESS_JSON_LOGS` | `false` | JSON formatted logs |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging, LoggingGuard};
pub use metrics::{gather_text, register_metrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialised(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics and install logging.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Structured log line for one delivered callback.
///
/// ```rust,ignore
/// log_callback!(info, event, listeners = delivered, "Callback published");
/// ```
#[macro_export]
macro_rules! log_callback {
    ($level:ident, $event:expr, $($rest:tt)+) => {
        tracing::$level!(
            role = %$event.role,
            kind = %$event.payload.kind(),
            reference_id = $event.payload.reference_id().unwrap_or("-"),
            request_id = $event.payload.request_id().unwrap_or("-"),
            $($rest)+
        )
    };
}
