//! # Event-Promise Correlator
//!
//! Turns "wait until role R receives a callback matching P" into a value a
//! test can `.await`.
//!
//! ## Flow
//!
//! ```text
//! test                         stream (rp1)                receiver rp1
//!  │ expect(&stream, P) ──────→ listener attached
//!  │ send API request (reference_id = abc123)
//!  │                                                 ←──── POST /callback
//!  │                           publish(event) ───────→ listener: P(payload)?
//!  │ ←──────────────────────── resolve(payload)
//!  │ drop(expectation) ───────→ listener detached
//! ```
//!
//! ## Guarantees
//!
//! - A correlator settles at most once; later matches are ignored.
//! - There is no built-in timeout. Bound waits with `within()`, which maps
//!   elapsed time to [`CorrelatorError::TimedOut`].
//! - Listeners live exactly as long as the owning [`Expectation`],
//!   [`ListenerScope`], or [`with_role_listener`] call.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod exclusive;
pub mod expectation;
pub mod promise;
pub mod scope;
pub mod status;

pub use error::{CorrelatorError, PartitionError};
pub use exclusive::ExclusivePredicates;
pub use expectation::{expect, expect_on, expect_or_reject, Expectation};
pub use promise::{create_event_promise, EventPromise, Resolver};
pub use scope::{with_role_listener, ListenerScope};
pub use status::{data_request_progression, StatusMatcher};
