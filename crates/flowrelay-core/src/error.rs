//! Error types for mapping, dispatch and the remote call.

use thiserror::Error;

/// Errors raised by the record mapper.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// The requested mapping type is not registered.
    #[error("unsupported mapping type: {0}")]
    UnsupportedMappingKind(String),
}

/// Errors raised by the dispatcher before or instead of producing a summary.
///
/// Per-batch failures are never raised; they end up as failed outcomes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No records to dispatch.
    #[error("record set is empty")]
    EmptyInput,

    /// Dispatch options are out of range.
    #[error("invalid dispatch options: {0}")]
    InvalidOptions(String),

    /// Dispatch was cancelled after `completed` batches finished.
    #[error("dispatch cancelled after {completed} batch(es)")]
    Cancelled { completed: usize },
}

/// Errors that can occur during a single remote call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connection refused, DNS, reset, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request timed out after the configured duration.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The payload source could not be found.
    #[error("data file not found: {0}")]
    NotFound(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Returns `true` if this error is transient.
    ///
    /// The dispatcher retries every failure up to its bound; this is used
    /// for log classification and by callers that want finer control.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::Other(_) => false,
        }
    }
}
