//! # Scoped Listeners
//!
//! Attach/detach discipline for test groups. Every listener created through
//! this module is detached when its scope ends, including when the scope
//! unwinds from a failed assertion.

use crate::expectation::matching_listener;
use crate::promise::{create_event_promise, EventPromise};
use callback_bus::{BusError, ListenerGuard, Predicate, RoleEventStream, RoleStreams};
use callback_types::{CallbackPayload, RoleId};
use std::future::Future;
use tracing::debug;

/// Run `body` with a correlator listening on `stream` for `predicate`.
///
/// The listener is attached before `body` starts and detached when `body`
/// finishes or panics. `body` only receives the promise, so it cannot keep
/// the listener alive past the call.
pub async fn with_role_listener<P, F, Fut, R>(stream: &RoleEventStream, predicate: P, body: F) -> R
where
    P: Predicate,
    F: FnOnce(EventPromise<CallbackPayload>) -> Fut,
    Fut: Future<Output = R>,
{
    let (resolver, promise) = create_event_promise();
    let never: Option<fn(&CallbackPayload) -> bool> = None;
    let _guard = stream.attach(matching_listener(stream.role(), resolver, predicate, never));
    body(promise).await
}

/// Listeners owned by one test group.
///
/// Create it where the group sets up (the `before` hook of a mocha suite),
/// register one correlator per expected event, and let it drop at the end of
/// the group. Dropping detaches exactly the listeners this scope attached,
/// leaving other groups' listeners alone.
pub struct ListenerScope {
    streams: RoleStreams,
    guards: Vec<ListenerGuard>,
}

impl ListenerScope {
    #[must_use]
    pub fn new(streams: &RoleStreams) -> Self {
        Self {
            streams: streams.clone(),
            guards: Vec::new(),
        }
    }

    /// Register a correlator on `role` for the next payload matching `predicate`.
    pub fn expect<P: Predicate>(
        &mut self,
        role: RoleId,
        predicate: P,
    ) -> Result<EventPromise<CallbackPayload>, BusError> {
        let stream = self.streams.stream(role)?;
        let (resolver, promise) = create_event_promise();
        let never: Option<fn(&CallbackPayload) -> bool> = None;
        let guard = stream.attach(matching_listener(role, resolver, predicate, never));
        self.guards.push(guard);
        Ok(promise)
    }

    /// Number of listeners this scope currently owns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Detach everything now. Returns how many were still attached.
    pub fn close(&mut self) -> usize {
        let detached = self
            .guards
            .drain(..)
            .filter(ListenerGuard::is_attached)
            .count();
        debug!(detached = detached, "Listener scope closed");
        detached
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        if !self.guards.is_empty() {
            self.close();
        }
    }
}
