//! Delivery rules of role streams and correlators, driven without HTTP.

use crate::fixtures::{deliver, payloads, QUIET, WAIT};
use callback_bus::{CallbackFilter, RoleStreams};
use callback_types::{CallbackEvent, CallbackKind, CallbackPayload, ReferenceId, RoleId};
use event_promise::{
    create_event_promise, expect, expect_on, with_role_listener, CorrelatorError, ListenerScope,
};
use futures::future::join_all;
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn streams() -> RoleStreams {
    RoleStreams::new([RoleId::rp(1), RoleId::idp(1), RoleId::as_(1)])
}

fn created(reference_id: &str) -> CallbackFilter {
    CallbackFilter::kind(CallbackKind::CreateRequestResult).and_reference_id(reference_id)
}

// =============================================================================
// AT-MOST-ONCE RESOLUTION
// =============================================================================

#[tokio::test]
async fn test_second_matching_event_does_not_change_value() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let expectation = expect(&rp, created("abc123"));

    deliver(&rp, payloads::create_request_result("abc123", "req-1", true));
    deliver(&rp, payloads::create_request_result("abc123", "req-2", false));

    let payload = expectation.within(WAIT).await.unwrap();
    assert_eq!(payload.request_id(), Some("req-1"));
    assert_eq!(payload.success(), Some(true));
}

#[tokio::test]
async fn test_reject_after_resolve_is_ignored() {
    let (resolver, promise) = create_event_promise::<u8>();
    assert!(resolver.resolve(1));
    assert!(!resolver.reject("late error callback"));
    assert_eq!(promise.within(WAIT).await, Ok(1));
}

proptest! {
    /// Whatever the interleaving, the correlator holds the first matching
    /// payload.
    #[test]
    fn prop_correlator_holds_first_match(
        marks in proptest::collection::vec((any::<bool>(), 0u32..1000), 1..24)
    ) {
        let streams = streams();
        let rp = streams.stream(RoleId::rp(1)).unwrap();
        let mut expectation = expect(&rp, CallbackFilter::all().and_field("wanted", true));

        for (wanted, seq) in &marks {
            deliver(&rp, json!({"type": "request_status", "wanted": wanted, "seq": seq}));
        }

        let first = marks.iter().find(|(wanted, _)| *wanted).map(|(_, seq)| *seq);
        match (first, expectation.try_settled()) {
            (Some(seq), Some(Ok(payload))) => {
                prop_assert_eq!(payload.get("seq").cloned(), Some(json!(seq)));
            }
            (None, None) => {}
            (expected, got) => prop_assert!(false, "expected {:?}, got {:?}", expected, got),
        }
    }
}

// =============================================================================
// NO REPLAY
// =============================================================================

#[tokio::test]
async fn test_listener_attached_after_publish_sees_nothing() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();

    deliver(&rp, payloads::create_request_result("abc123", "req-1", true));

    let late = expect(&rp, created("abc123"));
    let mut tap = rp.subscribe(CallbackFilter::all());
    assert_eq!(late.within(QUIET).await, Err(CorrelatorError::TimedOut(QUIET)));
    assert!(tap.try_recv().unwrap().is_none());
}

// =============================================================================
// PREDICATE ISOLATION AND FAN-OUT
// =============================================================================

#[tokio::test]
async fn test_disjoint_predicates_resolve_independently() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let first = ReferenceId::new().to_string();
    let second = ReferenceId::new().to_string();

    let mut a = expect(&rp, created(&first));
    let mut b = expect(&rp, created(&second));

    deliver(&rp, payloads::create_request_result(&first, "req-a", true));
    assert!(a.is_resolved());
    assert!(!b.is_resolved());
    assert!(b.try_settled().is_none());

    deliver(&rp, payloads::create_request_result(&second, "req-b", true));
    assert_eq!(a.try_settled().unwrap().unwrap().request_id(), Some("req-a"));
    assert_eq!(b.try_settled().unwrap().unwrap().request_id(), Some("req-b"));
}

#[tokio::test]
async fn test_identical_predicates_all_resolve() {
    let streams = streams();
    let idp = streams.stream(RoleId::idp(1)).unwrap();
    let filter = CallbackFilter::kind(CallbackKind::IncomingRequest).and_request_id("req-9");

    let expectations: Vec<_> = (0..3).map(|_| expect(&idp, filter.clone())).collect();
    assert_eq!(deliver(&idp, payloads::incoming_request("idp1", "req-9")), 3);

    let outcomes = join_all(expectations.into_iter().map(|e| e.within(WAIT))).await;
    for outcome in outcomes {
        assert_eq!(outcome.unwrap().request_id(), Some("req-9"));
    }
}

#[tokio::test]
async fn test_listeners_see_every_event_in_order() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let guards: Vec<_> = (0..2)
        .map(|listener| {
            let sink = Arc::clone(&seen);
            rp.attach(move |event: &CallbackEvent| {
                sink.lock()
                    .push((listener, event.payload.request_id().unwrap_or("").to_string()));
            })
        })
        .collect();

    deliver(&rp, payloads::create_request_result("r", "one", true));
    deliver(&rp, payloads::create_request_result("r", "two", true));

    assert_eq!(
        *seen.lock(),
        vec![
            (0, "one".to_string()),
            (1, "one".to_string()),
            (0, "two".to_string()),
            (1, "two".to_string()),
        ]
    );
    drop(guards);
}

#[tokio::test]
async fn test_panicking_listener_leaves_others_receiving() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let before = expect(&rp, created("abc123"));
    let faulty = rp.attach(|_: &CallbackEvent| panic!("listener bug"));
    let counter = Arc::clone(&calls);
    let counting = rp.attach(move |_: &CallbackEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let after = expect(&rp, created("abc123"));
    let mut tap = rp.subscribe(CallbackFilter::all());

    // The failed listener is not counted as reached.
    assert_eq!(deliver(&rp, payloads::create_request_result("abc123", "req-1", true)), 4);

    assert_eq!(before.within(WAIT).await.unwrap().request_id(), Some("req-1"));
    assert_eq!(after.within(WAIT).await.unwrap().request_id(), Some("req-1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let event = tap.try_recv().unwrap().unwrap();
    assert_eq!(event.payload.reference_id(), Some("abc123"));

    // The faulty listener stays attached and later events still flow.
    assert!(faulty.is_attached());
    deliver(&rp, payloads::create_request_result("abc123", "req-2", true));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    drop(counting);
}

// =============================================================================
// ROLE ISOLATION
// =============================================================================

#[tokio::test]
async fn test_event_on_one_role_never_reaches_another() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let idp = streams.stream(RoleId::idp(1)).unwrap();

    let on_rp = expect(&rp, CallbackFilter::all());
    let on_idp = expect(&idp, CallbackFilter::all());

    deliver(&idp, payloads::incoming_request("idp1", "req-1"));

    assert!(on_idp.is_resolved());
    assert!(!on_rp.is_resolved());
    assert_eq!(on_rp.within(QUIET).await, Err(CorrelatorError::TimedOut(QUIET)));
}

#[tokio::test]
async fn test_event_for_other_role_is_refused() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();
    let on_rp = expect(&rp, CallbackFilter::all());

    let payload = CallbackPayload::from_value(payloads::incoming_request("idp1", "r")).unwrap();
    assert!(rp
        .try_publish(CallbackEvent::new(RoleId::idp(1), payload))
        .is_err());
    assert!(!on_rp.is_resolved());
}

// =============================================================================
// LISTENER TEARDOWN
// =============================================================================

#[tokio::test]
async fn test_remove_all_listeners_stops_invocation() {
    let streams = streams();
    let as1 = streams.stream(RoleId::as_(1)).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let guard = as1.attach(move |_: &CallbackEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    deliver(&as1, payloads::data_request("req-1", "bank_statement"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(streams.remove_all_listeners(), 1);
    assert!(!guard.is_attached());
    deliver(&as1, payloads::data_request("req-2", "bank_statement"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scope_teardown_between_groups() {
    let streams = streams();
    let rp = streams.stream(RoleId::rp(1)).unwrap();

    // First group leaves a correlator unresolved.
    let stale = {
        let mut scope = ListenerScope::new(&streams);
        scope.expect(RoleId::rp(1), created("group-1")).unwrap()
    };
    assert_eq!(rp.listener_count(), 0);
    assert_eq!(stale.await, Err(CorrelatorError::Abandoned));

    // Second group is unaffected by the first one's leftovers.
    let mut scope = ListenerScope::new(&streams);
    let fresh = scope.expect(RoleId::rp(1), created("group-2")).unwrap();
    deliver(&rp, payloads::create_request_result("group-1", "old", true));
    deliver(&rp, payloads::create_request_result("group-2", "new", true));
    assert_eq!(fresh.within(WAIT).await.unwrap().request_id(), Some("new"));
}

#[tokio::test]
async fn test_with_role_listener_cleans_up_on_timeout() {
    let streams = streams();
    let idp = streams.stream(RoleId::idp(1)).unwrap();

    let outcome = with_role_listener(
        &idp,
        CallbackFilter::kind(CallbackKind::IncomingRequest),
        |promise| promise.within(QUIET),
    )
    .await;

    assert_eq!(outcome, Err(CorrelatorError::TimedOut(QUIET)));
    assert_eq!(idp.listener_count(), 0);
}

#[tokio::test]
async fn test_expect_on_unavailable_role_fails_fast() {
    let streams = streams();
    assert!(expect_on(&streams, RoleId::proxy(1), CallbackFilter::all()).is_err());
}
