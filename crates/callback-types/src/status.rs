//! # Request Status View
//!
//! Lenient projection of a `request_status` callback. The external network
//! owns the state machine; this view only exposes the fields tests use to
//! tell one step of the progression from another.

use crate::payload::{CallbackKind, CallbackPayload};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Observed request state, as reported in the `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestState {
    Pending,
    Confirmed,
    Rejected,
    Complicated,
    Completed,
    Errored,
    Other(String),
}

impl RequestState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Complicated => "complicated",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Other(raw) => raw,
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "rejected" => Self::Rejected,
            "complicated" => Self::Complicated,
            "completed" => Self::Completed,
            "errored" => Self::Errored,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RequestState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl Serialize for RequestState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RequestState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Per-service data progress inside a request status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceStatus {
    pub service_id: String,
    pub min_as: u32,
    pub signed_data_count: u32,
    pub received_data_count: u32,
}

/// Typed view of a `request_status` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestStatusView {
    pub request_id: String,
    pub status: RequestState,
    pub mode: u8,
    pub min_idp: u32,
    pub answered_idp_count: u32,
    pub closed: bool,
    pub timed_out: bool,
    pub service_list: Vec<ServiceStatus>,
    pub response_valid_list: Vec<serde_json::Value>,
    pub block_height: Option<serde_json::Value>,
}

impl RequestStatusView {
    /// Project a payload; `None` when it is not a `request_status` callback
    /// or its fields have the wrong JSON types.
    #[must_use]
    pub fn from_payload(payload: &CallbackPayload) -> Option<Self> {
        if payload.kind() != &CallbackKind::RequestStatus {
            return None;
        }
        serde_json::from_value(serde_json::Value::Object(payload.as_map().clone())).ok()
    }

    /// Every service has at least `min_as` signed data.
    #[must_use]
    pub fn all_data_signed(&self) -> bool {
        self.service_list
            .iter()
            .all(|s| s.signed_data_count >= s.min_as)
    }

    /// Every service has received at least `min_as` data.
    #[must_use]
    pub fn all_data_received(&self) -> bool {
        self.service_list
            .iter()
            .all(|s| s.received_data_count >= s.min_as)
    }
}
