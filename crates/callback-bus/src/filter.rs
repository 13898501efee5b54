//! # Callback Filters
//!
//! Predicates evaluated by listeners against incoming payloads. Matching is
//! always the listener's job; streams never filter.

use callback_types::{CallbackEvent, CallbackKind, CallbackPayload, RequestState};
use serde_json::Value;

/// Anything that can decide whether a payload is the one a test waits for.
///
/// Implemented for [`CallbackFilter`] and for any
/// `Fn(&CallbackPayload) -> bool` closure.
pub trait Predicate: Send + Sync + 'static {
    /// Does this payload satisfy the predicate?
    fn test(&self, payload: &CallbackPayload) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&CallbackPayload) -> bool + Send + Sync + 'static,
{
    fn test(&self, payload: &CallbackPayload) -> bool {
        self(payload)
    }
}

/// Declarative predicate: a set of accepted kinds plus field equalities.
///
/// ```ignore
/// let filter = CallbackFilter::kind(CallbackKind::CreateRequestResult)
///     .and_reference_id("abc123");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<CallbackKind>,
    /// Top-level fields that must equal the given values.
    pub fields: Vec<(String, Value)>,
}

impl CallbackFilter {
    /// Create a filter that accepts all payloads.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept a single kind.
    #[must_use]
    pub fn kind(kind: CallbackKind) -> Self {
        Self::kinds(vec![kind])
    }

    /// Accept any of the given kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<CallbackKind>) -> Self {
        Self {
            kinds,
            fields: Vec::new(),
        }
    }

    /// Require `payload[key] == value`.
    #[must_use]
    pub fn and_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn and_reference_id(self, reference_id: impl ToString) -> Self {
        self.and_field("reference_id", reference_id.to_string())
    }

    #[must_use]
    pub fn and_request_id(self, request_id: impl ToString) -> Self {
        self.and_field("request_id", request_id.to_string())
    }

    #[must_use]
    pub fn and_node_id(self, node_id: impl ToString) -> Self {
        self.and_field("node_id", node_id.to_string())
    }

    /// Require the `status` field of a request status callback.
    #[must_use]
    pub fn and_status(self, state: RequestState) -> Self {
        self.and_field("status", state.as_str().to_string())
    }

    /// Check if a payload matches this filter.
    #[must_use]
    pub fn matches(&self, payload: &CallbackPayload) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(payload.kind());

        kind_match
            && self
                .fields
                .iter()
                .all(|(key, expected)| payload.get(key) == Some(expected))
    }

    /// Check if an event's payload matches this filter.
    #[must_use]
    pub fn matches_event(&self, event: &CallbackEvent) -> bool {
        self.matches(&event.payload)
    }
}

impl Predicate for CallbackFilter {
    fn test(&self, payload: &CallbackPayload) -> bool {
        self.matches(payload)
    }
}
