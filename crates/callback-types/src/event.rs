//! # Callback Events
//!
//! One webhook delivery, tagged with the role whose receiver accepted it.

use crate::payload::{CallbackKind, CallbackPayload};
use crate::role::RoleId;
use std::time::SystemTime;

/// A decoded delivery, published once to its role's stream and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    /// Role whose endpoint received the delivery.
    pub role: RoleId,
    /// Decoded body.
    pub payload: CallbackPayload,
    /// Wall-clock receive time (for logs only, never used for ordering).
    pub received_at: SystemTime,
}

impl CallbackEvent {
    #[must_use]
    pub fn new(role: RoleId, payload: CallbackPayload) -> Self {
        Self {
            role,
            payload,
            received_at: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &CallbackKind {
        self.payload.kind()
    }
}
