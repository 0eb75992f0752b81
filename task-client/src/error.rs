//! Error types for the task service client.

use thiserror::Error;

/// Errors that can occur when talking to the task service.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// No session, or the session was rejected even after a refresh
    #[error("Authentication required")]
    AuthRequired,

    /// Login rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The refresh call failed; the session has been cleared
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// The in-flight refresh was abandoned before it produced an outcome
    #[error("Token refresh cancelled")]
    RefreshCancelled,

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

impl ClientError {
    /// Classify a transport error, separating "could not reach the server".
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ClientError::ServerUnreachable(e.to_string())
        } else {
            ClientError::Request(e)
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
