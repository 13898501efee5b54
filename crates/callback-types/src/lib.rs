//! # Callback Types Crate
//!
//! Data model shared by every harness component:
//!
//! - [`RoleId`]: the simulated node a webhook was delivered to (`rp1`, `idp2`, ...)
//! - [`CallbackPayload`]: the decoded JSON body, discriminated by its `type` field
//! - [`CallbackEvent`]: one delivery tagged with its role, published once and dropped
//! - [`ReferenceId`]: client-generated correlation token echoed back in callbacks
//!
//! ## Design Principles
//!
//! - **Observe, don't interpret**: payloads stay as JSON objects. Typed views
//!   such as [`RequestStatusView`] are lenient projections, never validation.
//! - **No retention**: events carry no sequence numbers and are never replayed.

pub mod errors;
pub mod event;
pub mod payload;
pub mod reference;
pub mod role;
pub mod status;

pub use errors::TypesError;
pub use event::CallbackEvent;
pub use payload::{CallbackKind, CallbackPayload};
pub use reference::ReferenceId;
pub use role::{RoleId, RoleKind};
pub use status::{RequestState, RequestStatusView, ServiceStatus};
