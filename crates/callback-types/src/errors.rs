//! # Error Types
//!
//! Errors raised while decoding roles and callback payloads.

use thiserror::Error;

/// Errors from constructing callback data model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Role prefix is not one of rp / idp / as / ndid / proxy.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Role index present but not a positive integer.
    #[error("invalid role index in {0}")]
    InvalidRoleIndex(String),

    /// Body was not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// Body was valid JSON but not an object.
    #[error("callback body must be a JSON object")]
    NotAnObject,

    /// Object has no string `type` discriminator.
    #[error("callback body has no string `type` field")]
    MissingType,
}
