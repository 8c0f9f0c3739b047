//! Error type for directory operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by a [`DirectoryClient`](super::DirectoryClient).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory answered with a non-success status.
    #[error("Directory API error ({status}): {code} - {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// The referenced object does not exist (yet).
    #[error("Directory object not found: {0}")]
    NotFound(String),

    /// Acquiring an access token failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectoryError {
    /// The object referenced by the call has not propagated yet.
    ///
    /// Freshly created users are eventually consistent: for a short while
    /// their sub-resources answer 404.
    pub fn is_not_yet_visible(&self) -> bool {
        match self {
            DirectoryError::NotFound(_) => true,
            DirectoryError::Api { status, code, .. } => {
                *status == StatusCode::NOT_FOUND || code == "Request_ResourceNotFound"
            }
            _ => false,
        }
    }

    /// Throttling, server-side failures and transport errors.
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            DirectoryError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether a follow-up call on a just-created object may succeed later.
    pub fn is_retryable(&self) -> bool {
        self.is_not_yet_visible() || self.is_transient()
    }
}
