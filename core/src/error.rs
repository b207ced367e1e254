//! Error types for the sync adapter.
//!
//! # Design
//! `UrlMissing` and `UnknownOperation` are precondition failures and are
//! returned synchronously from `SyncAdapter::dispatch`. Everything that can
//! only be known after the transport reports back (`Transport`, `Status`,
//! `BodyParse`) is delivered through the `error` callback and the promise
//! together.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors produced by the sync adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Neither the options nor the model supplied a URL.
    #[error("A \"url\" property or function must be specified")]
    UrlMissing,

    /// The operation name does not map to an HTTP method.
    #[error("unknown sync operation: {0}")]
    UnknownOperation(String),

    /// The transport reported a network or protocol failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was expected to be JSON but did not parse.
    #[error("failed to parse response body: {message}")]
    BodyParse { message: String },
}

impl SyncError {
    /// The message handed to the `error` callback: the underlying cause
    /// without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            SyncError::Transport { message } | SyncError::BodyParse { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A failure reported by a transport through `Completion::finish`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        SyncError::Transport {
            message: err.message,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::BodyParse {
            message: err.to_string(),
        }
    }
}
