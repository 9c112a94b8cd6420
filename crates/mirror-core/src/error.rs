use crate::retry::RetryClass;
use thiserror::Error;

/// Errors surfaced by a catalog source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credential rejected. Retrying cannot succeed.
    #[error("API credential rejected: {0}")]
    Auth(String),

    /// The remote signaled rate limiting for this request.
    #[error("rate limited by the remote API")]
    Throttled,

    /// Network-level failure (connect, timeout, broken transfer).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Unexpected HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be decoded or validated as a catalog page.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Maps the error to its retry disposition. Server-side statuses are
    /// transient; client-side statuses are not worth repeating.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            SourceError::Auth(_) | SourceError::Malformed(_) => RetryClass::Stop,
            SourceError::Throttled => RetryClass::Throttled,
            SourceError::Transport(_) => RetryClass::Retry,
            SourceError::Status { status, .. } if *status >= 500 => RetryClass::Retry,
            SourceError::Status { .. } => RetryClass::Stop,
        }
    }
}

/// Errors from the relational mirror store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to the store: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn query(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::Query(err.into())
    }
}

/// Errors from the raw-page archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode page for archiving: {0}")]
    Encode(#[from] serde_json::Error),
}
