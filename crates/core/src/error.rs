use thiserror::Error;

/// Failure talking to the remote API. Never reaches callers of the sync layer
/// directly: the remote client turns it into [`SyncError::BackendUnavailable`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("backend unavailable; serving mock data")]
    BackendUnavailable,
    #[error("todo '{0}' not found")]
    NotFound(String),
    #[error("todo title cannot be empty")]
    EmptyTitle,
}
