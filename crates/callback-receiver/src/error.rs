//! Receiver error types.
//!
//! [`ReceiverError`] is returned to the code that starts and stops
//! receivers. [`CallbackRejection`] is what a webhook sender sees when its
//! body cannot be decoded.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use callback_types::{RoleId, TypesError};
use serde::Serialize;
use std::net::SocketAddr;

use crate::config::ConfigError;

/// Rejection codes in the HTTP error body
pub mod codes {
    pub const MALFORMED_JSON: &str = "MALFORMED_JSON";
    pub const NOT_AN_OBJECT: &str = "NOT_AN_OBJECT";
    pub const MISSING_TYPE: &str = "MISSING_TYPE";
    pub const BODY_TOO_LARGE: &str = "BODY_TOO_LARGE";
    pub const UNREADABLE_BODY: &str = "UNREADABLE_BODY";
}

/// Errors from starting, running or stopping receivers
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Could not bind the role's socket
    #[error("failed to bind receiver for {role} on {addr}: {source}")]
    Bind {
        role: RoleId,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server task failed or panicked
    #[error("receiver for {role} failed: {message}")]
    Serve { role: RoleId, message: String },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No receiver runs for this role
    #[error("no receiver for role {0}")]
    UnknownRole(RoleId),
}

/// Body of a 400 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionDetail {
    pub code: &'static str,
    pub message: String,
}

/// A webhook the receiver refused. Answered with `400 Bad Request` and
/// `{"error": {"code": ..., "message": ...}}`; nothing is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRejection {
    pub detail: RejectionDetail,
}

impl CallbackRejection {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            detail: RejectionDetail {
                code,
                message: message.into(),
            },
        }
    }

    /// Body exceeded `max_body_size`
    pub fn too_large(limit: usize) -> Self {
        Self::new(
            codes::BODY_TOO_LARGE,
            format!("callback body exceeds {limit} bytes"),
        )
    }

    pub fn code(&self) -> &'static str {
        self.detail.code
    }
}

impl From<TypesError> for CallbackRejection {
    fn from(err: TypesError) -> Self {
        let code = match &err {
            TypesError::MalformedJson(_) => codes::MALFORMED_JSON,
            TypesError::NotAnObject => codes::NOT_AN_OBJECT,
            TypesError::MissingType => codes::MISSING_TYPE,
            TypesError::UnknownRole(_) | TypesError::InvalidRoleIndex(_) => codes::MALFORMED_JSON,
        };
        Self::new(code, err.to_string())
    }
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: &'a RejectionDetail,
}

impl IntoResponse for CallbackRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(RejectionBody {
                error: &self.detail,
            }),
        )
            .into_response()
    }
}
