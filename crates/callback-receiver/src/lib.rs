//! # Callback Receiver
//!
//! HTTP endpoints standing in for the webhook URLs of simulated nodes. Each
//! available role gets its own server; every accepted body becomes one
//! [`CallbackEvent`](callback_types::CallbackEvent) on that role's stream.
//!
//! ## Endpoints
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `POST` | `/callback` (configurable) | `204` after publishing, `400` with `{"error": {...}}` if undecodable |
//! | `GET` | `/health` | role, listener and publish counters |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let harness = CallbackHarness::start(HarnessConfig::default()).await?;
//! let rp = harness.stream(RoleId::rp(1))?;
//! let created = expect(&rp, CallbackFilter::kind(CallbackKind::CreateRequestResult)
//!     .and_reference_id(&reference_id));
//! // send the API call with callback_url = harness.callback_url(RoleId::rp(1))?
//! let payload = created.within(Duration::from_secs(10)).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod service;

pub use config::{ConfigError, HarnessConfig, LimitsConfig, RoleConfig};
pub use error::{CallbackRejection, ReceiverError, RejectionDetail};
pub use service::{CallbackHarness, CallbackReceiver, ReceiverHandle};
