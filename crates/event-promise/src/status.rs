//! Request status predicates.
//!
//! A request moves through several `request_status` callbacks that differ
//! only in sub-fields, so a bare `status == "completed"` check can match more
//! than one step. `StatusMatcher` pins the sub-fields that tell the steps
//! apart.

use crate::exclusive::ExclusivePredicates;
use callback_bus::Predicate;
use callback_types::{CallbackPayload, RequestState, RequestStatusView};

/// Predicate over a `request_status` payload.
///
/// Unset fields are not checked. Payloads of any other kind never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMatcher {
    request_id: Option<String>,
    state: Option<RequestState>,
    answered_idp_count: Option<u32>,
    signed_data_count: Option<u32>,
    received_data_count: Option<u32>,
    closed: Option<bool>,
    timed_out: Option<bool>,
}

impl StatusMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_id(mut self, request_id: impl ToString) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    #[must_use]
    pub fn state(mut self, state: RequestState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn answered_idp_count(mut self, count: u32) -> Self {
        self.answered_idp_count = Some(count);
        self
    }

    /// Signed data summed across every service in `service_list`.
    #[must_use]
    pub fn signed_data_count(mut self, count: u32) -> Self {
        self.signed_data_count = Some(count);
        self
    }

    /// Received data summed across every service in `service_list`.
    #[must_use]
    pub fn received_data_count(mut self, count: u32) -> Self {
        self.received_data_count = Some(count);
        self
    }

    #[must_use]
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = Some(closed);
        self
    }

    #[must_use]
    pub fn timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = Some(timed_out);
        self
    }

    /// Check a decoded view.
    #[must_use]
    pub fn matches_view(&self, view: &RequestStatusView) -> bool {
        // Summed in u64: per-service counts are u32 and come from the wire.
        let signed: u64 = view
            .service_list
            .iter()
            .map(|s| u64::from(s.signed_data_count))
            .sum();
        let received: u64 = view
            .service_list
            .iter()
            .map(|s| u64::from(s.received_data_count))
            .sum();

        self.request_id.as_deref().map_or(true, |id| view.request_id == id)
            && self.state.as_ref().map_or(true, |state| &view.status == state)
            && self
                .answered_idp_count
                .map_or(true, |count| view.answered_idp_count == count)
            && self.signed_data_count.map_or(true, |count| signed == u64::from(count))
            && self
                .received_data_count
                .map_or(true, |count| received == u64::from(count))
            && self.closed.map_or(true, |closed| view.closed == closed)
            && self.timed_out.map_or(true, |timed_out| view.timed_out == timed_out)
    }
}

impl Predicate for StatusMatcher {
    fn test(&self, payload: &CallbackPayload) -> bool {
        RequestStatusView::from_payload(payload).is_some_and(|view| self.matches_view(&view))
    }
}

/// Status predicates for one data request with a single IdP and a single AS:
/// `pending`, `confirmed` (IdP answered, no data yet), `data_signed`,
/// `completed` (data received, still open) and `closed`.
#[must_use]
pub fn data_request_progression(request_id: &str) -> ExclusivePredicates {
    let base = StatusMatcher::new().request_id(request_id).timed_out(false);

    ExclusivePredicates::new()
        .add(
            "pending",
            base.clone()
                .state(RequestState::Pending)
                .answered_idp_count(0)
                .closed(false),
        )
        .add(
            "confirmed",
            base.clone()
                .state(RequestState::Confirmed)
                .answered_idp_count(1)
                .signed_data_count(0)
                .closed(false),
        )
        .add(
            "data_signed",
            base.clone()
                .state(RequestState::Confirmed)
                .answered_idp_count(1)
                .signed_data_count(1)
                .received_data_count(0)
                .closed(false),
        )
        .add(
            "completed",
            base.clone()
                .state(RequestState::Completed)
                .received_data_count(1)
                .closed(false),
        )
        .add(
            "closed",
            base.state(RequestState::Completed).closed(true),
        )
}
