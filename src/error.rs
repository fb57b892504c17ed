//! Error types for the quote store.

use crate::actions::ActionKind;
use thiserror::Error;

/// Main error type for store operations.
///
/// Cloneable so a single failure can be reported into `ui.error` and still be
/// returned to the caller of `dispatch`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Reducer for {kind} failed: {message}")]
    Reducer { kind: ActionKind, message: String },

    #[error("Middleware {middleware} failed: {message}")]
    Middleware {
        middleware: &'static str,
        message: String,
    },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid payload for {kind}: {message}")]
    InvalidPayload { kind: String, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Storage is locked by another process")]
    Locked,
}

impl StoreError {
    /// Build a reducer failure for `kind`.
    pub fn reducer(kind: ActionKind, message: impl Into<String>) -> Self {
        StoreError::Reducer {
            kind,
            message: message.into(),
        }
    }

    /// Build a middleware failure attributed to `middleware`.
    pub fn middleware(middleware: &'static str, message: impl Into<String>) -> Self {
        StoreError::Middleware {
            middleware,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StoreError::Deserialization(e.to_string())
        } else {
            StoreError::Serialization(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
