//! # Error Module
//!
//! Every failure that can happen while a request is parsed, resolved, bound or
//! executed is a [`DispatchError`]. The dispatcher catches it exactly once, at the
//! outermost boundary, and turns it into the error envelope:
//!
//! ```json
//! { "Type": "Error", "Code": 3, "Message": "object not found: name://Hosts/abc123" }
//! ```
//!
//! Codes are stable and part of the wire contract. `Code: 1` is reserved for
//! failures that have no specific kind (see [`GENERIC_ERROR_CODE`]).

use crate::store::StoreError;
use serde_json::{json, Value};
use thiserror::Error;

/// Envelope code used when a failure has no specific kind.
pub const GENERIC_ERROR_CODE: i64 = 1;

/// Errors surfaced to clients through the error envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Malformed address, reserved action name, or a collection mutation whose
    /// path falls outside the collection namespace.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The scheme/collection exists but the specific record does not.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    /// An unconditional create collided with an existing record.
    #[error("object already exists: {0}")]
    AlreadyExist(String),
    /// The resolved object has no action with the requested name.
    #[error("operation not supported: {0}")]
    NotSupported(String),
    /// Security token is malformed, expired or carries a bad signature.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    /// The caller is authenticated but not allowed to perform the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The action exists but cannot run in the object's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Any document store failure.
    #[error("database error: {0}")]
    Db(#[from] StoreError),
}

impl DispatchError {
    /// Stable integer code written to the envelope `Code` field.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            DispatchError::InvalidArgument(_) => 2,
            DispatchError::ObjectNotFound(_) => 3,
            DispatchError::AlreadyExist(_) => 4,
            DispatchError::NotSupported(_) => 5,
            DispatchError::InvalidCredential(_) => 6,
            DispatchError::Db(_) => 7,
            DispatchError::InvalidOperation(_) => 8,
            DispatchError::PermissionDenied(_) => 9,
        }
    }

    /// HTTP status hint for the transport layer.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::InvalidArgument(_) => 400,
            DispatchError::InvalidCredential(_) => 401,
            DispatchError::PermissionDenied(_) => 403,
            DispatchError::ObjectNotFound(_) => 404,
            DispatchError::AlreadyExist(_) | DispatchError::InvalidOperation(_) => 409,
            DispatchError::NotSupported(_) => 501,
            DispatchError::Db(_) => 500,
        }
    }

    /// Short kind name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidArgument(_) => "InvalidArgumentException",
            DispatchError::ObjectNotFound(_) => "ObjectNotFoundException",
            DispatchError::AlreadyExist(_) => "AlreadyExistException",
            DispatchError::NotSupported(_) => "NotSupportedException",
            DispatchError::InvalidCredential(_) => "InvalidCredentialException",
            DispatchError::PermissionDenied(_) => "PermissionDeniedException",
            DispatchError::InvalidOperation(_) => "InvalidOperationException",
            DispatchError::Db(_) => "DbException",
        }
    }

    /// Render the error envelope for this failure.
    #[must_use]
    pub fn envelope(&self) -> Value {
        error_envelope(self.code(), &self.to_string())
    }
}

/// Build an error envelope from a raw code and message.
#[must_use]
pub fn error_envelope(code: i64, message: &str) -> Value {
    json!({
        "Type": "Error",
        "Code": code,
        "Message": message,
    })
}
