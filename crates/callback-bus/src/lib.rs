//! # Callback Bus - Role Event Streams
//!
//! One publish/subscribe stream per simulated role. The role's HTTP receiver
//! publishes every decoded webhook; correlators and taps listen.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────────┐   listener(&event)
//! │ Receiver rp1 │ ────────────→ │ RoleEventStream  │ ───────────────────→ correlators
//! └──────────────┘               │      (rp1)       │   broadcast
//!                                └──────────────────┘ ───────────────────→ taps (Subscription)
//! ```
//!
//! ## Delivery Rules
//!
//! - **Synchronous fan-out:** every listener attached when `publish()` is called
//!   runs before `publish()` returns. No filtering happens at the stream.
//! - **No replay:** nothing is buffered for listeners attached later.
//! - **Scoped listeners:** `attach()` returns a [`ListenerGuard`]; dropping it
//!   detaches the listener, so a failing test cannot leak it into the next one.
//! - **Role isolation:** streams share nothing; [`RoleStreams`] owns one per role.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod filter;
pub mod listener;
pub mod registry;
pub mod stream;
pub mod subscriber;

pub use filter::{CallbackFilter, Predicate};
pub use listener::{ListenerGuard, ListenerId};
pub use registry::RoleStreams;
pub use stream::{EventPublisher, RoleEventStream};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

use callback_types::RoleId;
use thiserror::Error;

/// Maximum events buffered per tap subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Errors from stream lookup and publication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No stream was created for this role at harness start.
    #[error("no event stream for role {0}")]
    UnknownRole(RoleId),

    /// Event tagged for another role was published on this stream.
    #[error("event for role {actual} published on stream {expected}")]
    RoleMismatch { expected: RoleId, actual: RoleId },
}
