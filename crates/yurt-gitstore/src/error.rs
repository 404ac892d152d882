// error.rs — Error taxonomy for repository store operations.
//
// The taxonomy is the caller's contract: NotFound and Validation are
// surfaced to the user, Conflict means someone else won a write race (or
// the branch is protected), Transient is the only class worth retrying.
// The core never retries; that belongs to calling layers.

use thiserror::Error;

/// Errors from the backing repository store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file, branch, or ref does not exist (404-equivalent).
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The write was rejected: stale sha, protected branch, or merge
    /// conflict (403/409-equivalent).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The host rejected the request payload (422-equivalent).
    #[error("validation rejected by host: {reason}")]
    Validation { reason: String },

    /// Rate limiting or a server-side failure; retrying later may succeed.
    #[error("transient store failure: {reason}")]
    Transient { reason: String },

    /// Any other HTTP failure status.
    #[error("store request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The transport itself failed (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be interpreted.
    #[error("could not decode response for {context}: {reason}")]
    Decode { context: String, reason: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. } | StoreError::Transport(_))
    }

    /// Classify an HTTP failure status into the taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => StoreError::NotFound { what: message },
            409 => StoreError::Conflict { reason: message },
            403 => {
                // GitHub reports both rate limiting and protected-branch
                // rejections as 403; tell them apart by message.
                if message.to_lowercase().contains("rate limit") {
                    StoreError::Transient { reason: message }
                } else {
                    StoreError::Conflict { reason: message }
                }
            }
            422 => StoreError::Validation { reason: message },
            429 => StoreError::Transient { reason: message },
            s if s >= 500 => StoreError::Transient { reason: message },
            s => StoreError::Http { status: s, message },
        }
    }
}
