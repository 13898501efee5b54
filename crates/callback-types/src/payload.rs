//! # Callback Payloads
//!
//! A payload is the decoded body of one webhook. It is kept as a JSON object
//! so tests can assert on any field the external node sends; the `type`
//! field is the only structure the harness relies on.

use crate::errors::TypesError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Discriminator carried in the `type` field of every callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// RP: outcome of `POST /rp/requests`.
    CreateRequestResult,
    /// IdP: a new request needs a response.
    IncomingRequest,
    /// IdP: outcome of a submitted response.
    ResponseResult,
    /// AS: a data request to answer.
    DataRequest,
    /// AS: outcome of sending data.
    SendDataResult,
    /// Request status progression update.
    RequestStatus,
    /// IdP: accessor signing request.
    AccessorSignCallback,
    /// IdP: outcome of identity creation.
    CreateIdentityResult,
    /// IdP: outcome of adding an accessor.
    AddAccessorResult,
    /// RP: outcome of closing a request.
    CloseRequestResult,
    /// IdP: outcome of `POST /idp/response` acceptance.
    CreateResponseResult,
    /// Asynchronous processing error.
    Error,
    /// Any discriminator the harness does not name.
    Other(String),
}

impl CallbackKind {
    /// Wire string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateRequestResult => "create_request_result",
            Self::IncomingRequest => "incoming_request",
            Self::ResponseResult => "response_result",
            Self::DataRequest => "data_request",
            Self::SendDataResult => "send_data_result",
            Self::RequestStatus => "request_status",
            Self::AccessorSignCallback => "accessor_sign_callback",
            Self::CreateIdentityResult => "create_identity_result",
            Self::AddAccessorResult => "add_accessor_result",
            Self::CloseRequestResult => "close_request_result",
            Self::CreateResponseResult => "create_response_result",
            Self::Error => "error",
            Self::Other(raw) => raw,
        }
    }

    /// Parse a wire string; unknown values become [`CallbackKind::Other`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "create_request_result" => Self::CreateRequestResult,
            "incoming_request" => Self::IncomingRequest,
            "response_result" => Self::ResponseResult,
            "data_request" => Self::DataRequest,
            "send_data_result" => Self::SendDataResult,
            "request_status" => Self::RequestStatus,
            "accessor_sign_callback" => Self::AccessorSignCallback,
            "create_identity_result" => Self::CreateIdentityResult,
            "add_accessor_result" => Self::AddAccessorResult,
            "close_request_result" => Self::CloseRequestResult,
            "create_response_result" => Self::CreateResponseResult,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallbackKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CallbackKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Decoded webhook body. Always a JSON object with a string `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    kind: CallbackKind,
    fields: Map<String, Value>,
}

impl CallbackPayload {
    /// Decode a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, TypesError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| TypesError::MalformedJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, TypesError> {
        let Value::Object(fields) = value else {
            return Err(TypesError::NotAnObject);
        };
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(CallbackKind::parse)
            .ok_or(TypesError::MissingType)?;
        Ok(Self { kind, fields })
    }

    /// The `type` discriminator.
    #[must_use]
    pub fn kind(&self) -> &CallbackKind {
        &self.kind
    }

    /// The raw `type` string.
    #[must_use]
    pub fn type_str(&self) -> &str {
        self.kind.as_str()
    }

    /// Node that emitted the callback, if present.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.str_field("node_id")
    }

    /// Client-generated reference id echoed back by the node.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.str_field("reference_id")
    }

    /// Request id assigned by the network.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.str_field("request_id")
    }

    /// The `success` flag of `*_result` callbacks.
    #[must_use]
    pub fn success(&self) -> Option<bool> {
        self.fields.get("success").and_then(Value::as_bool)
    }

    /// Any top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Top-level string field.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// All fields, including `type`.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Back to a plain JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Value> for CallbackPayload {
    type Error = TypesError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl Serialize for CallbackPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CallbackPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
