//! End-to-end flows: webhooks posted over HTTP to running receivers.

use crate::fixtures::{payloads, start_full_harness, start_local_harness, WebhookClient, QUIET, WAIT};
use callback_bus::CallbackFilter;
use callback_receiver::error::codes;
use callback_receiver::ReceiverError;
use callback_types::{CallbackKind, ReferenceId, RoleId};
use event_promise::{expect, expect_on, expect_or_reject, CorrelatorError, ListenerScope};
use harness_telemetry::metrics;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_create_request_result_resolves_matching_reference() {
    let harness = start_local_harness().await;
    let client = WebhookClient::new();
    let rp = harness.stream(RoleId::rp(1)).unwrap();
    let url = harness.callback_url(RoleId::rp(1)).unwrap();

    let wanted = expect(
        &rp,
        CallbackFilter::kind(CallbackKind::CreateRequestResult).and_reference_id("abc123"),
    );
    let other = expect(
        &rp,
        CallbackFilter::kind(CallbackKind::CreateRequestResult).and_reference_id("zzz999"),
    );

    let status = client
        .post_json(&url, &payloads::create_request_result("abc123", "req-1", true))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let payload = wanted.within(WAIT).await.unwrap();
    assert_eq!(payload.reference_id(), Some("abc123"));
    assert_eq!(payload.request_id(), Some("req-1"));
    assert_eq!(payload.success(), Some(true));

    assert_eq!(other.within(QUIET).await, Err(CorrelatorError::TimedOut(QUIET)));

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_bodies_are_refused_without_delivery() {
    let harness = start_local_harness().await;
    let client = WebhookClient::new();
    let rp = harness.stream(RoleId::rp(1)).unwrap();
    let url = harness.callback_url(RoleId::rp(1)).unwrap();

    let mut anything = rp.subscribe(CallbackFilter::all());
    let rejected = |code: &str| {
        metrics::CALLBACKS_REJECTED
            .with_label_values(&["rp1", code])
            .get()
    };
    let malformed_before = rejected(codes::MALFORMED_JSON);

    let cases = [
        ("{not json", codes::MALFORMED_JSON),
        ("[1, 2, 3]", codes::NOT_AN_OBJECT),
        (r#"{"reference_id": "abc123"}"#, codes::MISSING_TYPE),
    ];
    for (body, code) in cases {
        let (status, error) = client.post_raw(&url, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        let error = error.unwrap();
        assert_eq!(error["error"]["code"], json!(code), "body {body}");
    }

    assert!(anything.try_recv().unwrap().is_none());
    // Other tests share the process-wide counters, so only a lower bound holds.
    assert!(rejected(codes::MALFORMED_JSON) >= malformed_before + 1.0);
    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_error_callback_rejects_waiting_correlator() {
    let harness = start_local_harness().await;
    let client = WebhookClient::new();
    let rp = harness.stream(RoleId::rp(1)).unwrap();
    let url = harness.callback_url(RoleId::rp(1)).unwrap();
    let reference_id = ReferenceId::new().to_string();

    let created = expect_or_reject(
        &rp,
        CallbackFilter::kind(CallbackKind::CreateRequestResult).and_reference_id(&reference_id),
        CallbackFilter::kind(CallbackKind::Error).and_reference_id(&reference_id),
    );

    let status = client
        .post_json(&url, &payloads::error(&reference_id, 20025))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    match created.within(WAIT).await {
        Err(CorrelatorError::Rejected(reason)) => {
            assert!(reason.contains("error callback on rp1"), "{reason}");
            assert!(reason.contains("20025"), "{reason}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_request_flow_across_roles() {
    let harness = start_local_harness().await;
    let client = WebhookClient::new();
    let reference_id = ReferenceId::new().to_string();
    let request_id = "req-flow-1";

    let mut scope = ListenerScope::new(harness.streams());
    let created = scope
        .expect(
            RoleId::rp(1),
            CallbackFilter::kind(CallbackKind::CreateRequestResult).and_reference_id(&reference_id),
        )
        .unwrap();
    let incoming = scope
        .expect(
            RoleId::idp(1),
            CallbackFilter::kind(CallbackKind::IncomingRequest).and_request_id(request_id),
        )
        .unwrap();
    let data = scope
        .expect(
            RoleId::as_(1),
            CallbackFilter::kind(CallbackKind::DataRequest)
                .and_request_id(request_id)
                .and_field("service_id", "bank_statement"),
        )
        .unwrap();
    assert_eq!(scope.len(), 3);

    // Deliveries arrive in the order the platform would send them.
    let rp_url = harness.callback_url(RoleId::rp(1)).unwrap();
    let idp_url = harness.callback_url(RoleId::idp(1)).unwrap();
    let as_url = harness.callback_url(RoleId::as_(1)).unwrap();
    client
        .post_json(&rp_url, &payloads::create_request_result(&reference_id, request_id, true))
        .await;
    client
        .post_json(&idp_url, &payloads::incoming_request("idp1", request_id))
        .await;
    client
        .post_json(&as_url, &payloads::data_request(request_id, "bank_statement"))
        .await;

    let created = created.within(WAIT).await.unwrap();
    let incoming = incoming.within(WAIT).await.unwrap();
    let data = data.within(WAIT).await.unwrap();

    assert_eq!(created.request_id(), Some(request_id));
    assert_eq!(incoming.str_field("requester_node_id"), Some("rp1"));
    assert_eq!(data.str_field("service_id"), Some("bank_statement"));

    assert_eq!(scope.close(), 3);
    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_callbacks_stay_on_their_role() {
    let harness = start_local_harness().await;
    let client = WebhookClient::new();
    let rp = harness.stream(RoleId::rp(1)).unwrap();
    let idp = harness.stream(RoleId::idp(1)).unwrap();

    let on_rp = expect(&rp, CallbackFilter::all());
    let on_idp = expect(&idp, CallbackFilter::kind(CallbackKind::IncomingRequest));

    let idp_url = harness.callback_url(RoleId::idp(1)).unwrap();
    client
        .post_json(&idp_url, &payloads::incoming_request("idp1", "req-2"))
        .await;

    assert_eq!(on_idp.within(WAIT).await.unwrap().request_id(), Some("req-2"));
    assert_eq!(on_rp.within(QUIET).await, Err(CorrelatorError::TimedOut(QUIET)));

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unavailable_role_has_no_endpoint() {
    let harness = start_local_harness().await;

    assert!(!harness.is_available(RoleId::idp(2)));
    assert!(matches!(
        harness.callback_url(RoleId::idp(2)),
        Err(ReceiverError::UnknownRole(role)) if role == RoleId::idp(2)
    ));
    assert!(matches!(
        harness.stream(RoleId::proxy(1)),
        Err(ReceiverError::UnknownRole(_))
    ));
    assert!(expect_on(harness.streams(), RoleId::ndid(), CallbackFilter::all()).is_err());

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_role_can_be_switched_on() {
    let harness = start_full_harness().await;
    let client = WebhookClient::new();

    let roles: Vec<RoleId> = harness.roles().collect();
    assert_eq!(roles.len(), harness.config().roles.len());

    for role in roles {
        let stream = harness.stream(role).unwrap();
        let url = harness.callback_url(role).unwrap();
        let reference_id = ReferenceId::new().to_string();
        let expectation = expect(&stream, CallbackFilter::all().and_reference_id(&reference_id));

        let status = client
            .post_json(&url, &json!({"type": "error", "reference_id": reference_id}))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT, "role {role}");
        assert!(expectation.within(WAIT).await.is_ok(), "role {role}");
    }

    harness.shutdown().await.unwrap();
}
