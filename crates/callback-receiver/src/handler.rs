//! Webhook handlers.
//!
//! `POST {path}` decodes the body and publishes it to the role's stream
//! before answering, so every listener attached at that moment has run by
//! the time the sender sees `204 No Content`.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use callback_bus::{EventPublisher, RoleEventStream};
use callback_types::{CallbackEvent, CallbackKind, CallbackPayload, RoleId};
use harness_telemetry::{log_callback, metrics};
use std::sync::Arc;
use tracing::warn;

use crate::error::{codes, CallbackRejection};

/// State shared by one receiver's handlers
#[derive(Clone)]
pub struct ReceiverState {
    pub role: RoleId,
    pub stream: Arc<RoleEventStream>,
    pub max_body_size: usize,
}

/// Accept one webhook delivery.
pub async fn receive_callback(
    State(state): State<ReceiverState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, CallbackRejection> {
    let role = state.role.to_string();

    let payload = match decode(&state, body) {
        Ok(payload) => payload,
        Err(rejection) => {
            metrics::record_callback_rejected(&role, rejection.code());
            warn!(
                role = %state.role,
                code = rejection.code(),
                message = %rejection.detail.message,
                "Callback rejected"
            );
            return Err(rejection);
        }
    };

    metrics::record_callback_received(&role, kind_label(payload.kind()));
    let event = CallbackEvent::new(state.role, payload);
    log_callback!(info, event, "Callback received");

    let reached = state.stream.publish(event);
    tracing::debug!(role = %state.role, reached = reached, "Callback published");

    Ok(StatusCode::NO_CONTENT)
}

fn decode(
    state: &ReceiverState,
    body: Result<Bytes, BytesRejection>,
) -> Result<CallbackPayload, CallbackRejection> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            CallbackRejection::too_large(state.max_body_size)
        } else {
            CallbackRejection::new(codes::UNREADABLE_BODY, rejection.body_text())
        }
    })?;

    Ok(CallbackPayload::from_slice(&bytes)?)
}

/// Metric label for a callback type. Unknown types share one label.
fn kind_label(kind: &CallbackKind) -> &str {
    match kind {
        CallbackKind::Other(_) => "other",
        known => known.as_str(),
    }
}

/// Liveness check with the role's stream counters.
pub async fn health_check(State(state): State<ReceiverState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "role": state.role,
        "listeners": state.stream.listener_count(),
        "subscribers": state.stream.subscriber_count(),
        "events_published": state.stream.events_published(),
    }))
}
