//! Shared test fixtures.

use callback_bus::{EventPublisher, RoleEventStream};
use callback_receiver::{CallbackHarness, HarnessConfig};
use callback_types::{CallbackEvent, CallbackPayload};
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound for any wait that is expected to succeed.
pub const WAIT: Duration = Duration::from_secs(2);

/// How long to watch for something that must not happen.
pub const QUIET: Duration = Duration::from_millis(100);

/// Harness with the default role set on ephemeral loopback ports.
pub async fn start_local_harness() -> CallbackHarness {
    CallbackHarness::start(HarnessConfig::default().with_ephemeral_ports())
        .await
        .unwrap()
}

/// Harness with every default role switched on.
pub async fn start_full_harness() -> CallbackHarness {
    let mut config = HarnessConfig::default().with_ephemeral_ports();
    for role in &mut config.roles {
        role.available = true;
    }
    CallbackHarness::start(config).await.unwrap()
}

/// Publish a synthetic delivery without HTTP.
pub fn deliver(stream: &RoleEventStream, value: Value) -> usize {
    let payload = CallbackPayload::from_value(value).unwrap();
    stream.publish(CallbackEvent::new(stream.role(), payload))
}

/// Minimal stand-in for a node posting webhooks.
#[derive(Clone, Default)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// POST a JSON body; returns the status.
    pub async fn post_json(&self, url: &str, body: &Value) -> reqwest::StatusCode {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .unwrap()
            .status()
    }

    /// POST raw bytes; returns the status and the parsed error body, if any.
    pub async fn post_raw(&self, url: &str, body: &str) -> (reqwest::StatusCode, Option<Value>) {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = response.status();
        let body = response.json::<Value>().await.ok();
        (status, body)
    }
}

/// Payload builders for the callback types the scenarios use.
pub mod payloads {
    use super::*;

    pub fn create_request_result(reference_id: &str, request_id: &str, success: bool) -> Value {
        json!({
            "node_id": "rp1",
            "type": "create_request_result",
            "reference_id": reference_id,
            "request_id": request_id,
            "creation_block_height": "test-chain:10",
            "success": success
        })
    }

    pub fn incoming_request(node_id: &str, request_id: &str) -> Value {
        json!({
            "node_id": node_id,
            "type": "incoming_request",
            "mode": 2,
            "request_id": request_id,
            "request_message": "Consent request",
            "request_message_hash": "hash",
            "requester_node_id": "rp1",
            "min_ial": 2.3,
            "min_aal": 3,
            "data_request_list": [],
            "creation_time": 1_700_000_000_000u64,
            "request_timeout": 86_400
        })
    }

    pub fn data_request(request_id: &str, service_id: &str) -> Value {
        json!({
            "node_id": "as1",
            "type": "data_request",
            "request_id": request_id,
            "mode": 2,
            "service_id": service_id,
            "requester_node_id": "rp1",
            "request_params": "{}",
            "max_ial": 2.3,
            "max_aal": 3
        })
    }

    pub fn request_status(
        request_id: &str,
        status: &str,
        answered_idp_count: u32,
        signed: u32,
        received: u32,
        closed: bool,
    ) -> Value {
        json!({
            "node_id": "rp1",
            "type": "request_status",
            "request_id": request_id,
            "status": status,
            "mode": 2,
            "min_idp": 1,
            "answered_idp_count": answered_idp_count,
            "closed": closed,
            "timed_out": false,
            "service_list": [{
                "service_id": "bank_statement",
                "min_as": 1,
                "signed_data_count": signed,
                "received_data_count": received
            }],
            "response_valid_list": [],
            "block_height": "test-chain:11"
        })
    }

    pub fn error(reference_id: &str, code: u32) -> Value {
        json!({
            "node_id": "rp1",
            "type": "error",
            "reference_id": reference_id,
            "success": false,
            "error": {"code": code, "message": "rejected by node"}
        })
    }
}
