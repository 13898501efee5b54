//! # Expectations
//!
//! A correlator wired to a role stream: "the next event on role R whose
//! payload matches P". The listener stays attached until the expectation is
//! dropped; after the first match it ignores everything.

use crate::error::CorrelatorError;
use crate::promise::{create_event_promise, EventPromise, Resolver};
use callback_bus::{BusError, ListenerGuard, Predicate, RoleEventStream, RoleStreams};
use callback_types::{CallbackEvent, CallbackPayload, RoleId};
use harness_telemetry::metrics;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::debug;

/// Awaitable expectation of one matching callback.
///
/// Dropping it detaches the listener. If the listener is removed from the
/// stream some other way (`remove_all_listeners`) before a match, awaiting
/// yields [`CorrelatorError::Abandoned`].
#[must_use = "an expectation does nothing unless awaited"]
pub struct Expectation {
    role: RoleId,
    promise: EventPromise<CallbackPayload>,
    guard: ListenerGuard,
}

/// Expect the next payload on `stream` that satisfies `predicate`.
pub fn expect<P: Predicate>(stream: &RoleEventStream, predicate: P) -> Expectation {
    let (resolver, promise) = create_event_promise();
    let role = stream.role();
    let never: Option<fn(&CallbackPayload) -> bool> = None;
    let guard = stream.attach(matching_listener(role, resolver, predicate, never));
    Expectation {
        role,
        promise,
        guard,
    }
}

/// Like [`expect`], but a payload satisfying `reject_if` rejects the
/// correlator instead (for example an `error` callback for the same
/// reference id), so the test fails fast instead of waiting out a timeout.
pub fn expect_or_reject<P, R>(stream: &RoleEventStream, predicate: P, reject_if: R) -> Expectation
where
    P: Predicate,
    R: Predicate,
{
    let (resolver, promise) = create_event_promise();
    let role = stream.role();
    let guard = stream.attach(matching_listener(role, resolver, predicate, Some(reject_if)));
    Expectation {
        role,
        promise,
        guard,
    }
}

/// [`expect`] on the stream registered for `role`.
pub fn expect_on<P: Predicate>(
    streams: &RoleStreams,
    role: RoleId,
    predicate: P,
) -> Result<Expectation, BusError> {
    let stream = streams.stream(role)?;
    Ok(expect(&stream, predicate))
}

pub(crate) fn matching_listener<P, R>(
    role: RoleId,
    resolver: Resolver<CallbackPayload>,
    predicate: P,
    reject_if: Option<R>,
) -> impl Fn(&CallbackEvent) + Send + Sync + 'static
where
    P: Predicate,
    R: Predicate,
{
    move |event: &CallbackEvent| {
        if resolver.is_settled() {
            return;
        }
        if predicate.test(&event.payload) {
            if resolver.resolve(event.payload.clone()) {
                metrics::record_correlator_settled(&role.to_string(), true);
                debug!(role = %role, kind = %event.kind(), "Correlator resolved");
            }
        } else if let Some(reject_if) = &reject_if {
            if reject_if.test(&event.payload) {
                let reason = format!(
                    "{} callback on {}: {}",
                    event.kind(),
                    role,
                    serde_json::Value::Object(event.payload.as_map().clone())
                );
                if resolver.reject(reason) {
                    metrics::record_correlator_settled(&role.to_string(), false);
                    debug!(role = %role, kind = %event.kind(), "Correlator rejected");
                }
            }
        }
    }
}

impl Expectation {
    /// Role whose stream this expectation listens on.
    #[must_use]
    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Has a matching (or rejecting) callback arrived?
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.promise.is_settled()
    }

    /// Take the outcome if already settled. See [`EventPromise::try_settled`].
    pub fn try_settled(&mut self) -> Option<Result<CallbackPayload, CorrelatorError>> {
        self.promise.try_settled()
    }

    /// Is the listener still attached?
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.guard.is_attached()
    }

    /// Await for at most `timeout`. The listener is detached afterwards.
    pub async fn within(self, timeout: Duration) -> Result<CallbackPayload, CorrelatorError> {
        match tokio::time::timeout(timeout, self).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CorrelatorError::TimedOut(timeout)),
        }
    }
}

impl Future for Expectation {
    type Output = Result<CallbackPayload, CorrelatorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.promise).poll(cx)
    }
}
