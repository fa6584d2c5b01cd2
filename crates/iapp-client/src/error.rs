//! Error types for the appliance and cluster clients

use thiserror::Error;

/// Placeholder used when a response carries no readable error message
pub const NO_ERROR_MESSAGE: &str = "no error message";

/// Errors that can occur when talking to the appliance or the device cluster
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL built from connection parameters
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Remote side rejected the request with an explanation
    #[error("{0}")]
    Remote(String),

    /// Remote side answered with a status code this call does not accept
    #[error("An unexpected HTTP response code = {status} has been received")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
    },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if the error came from the transport rather than the remote API
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http(e) if !e.is_decode())
    }

    /// HTTP status attached to the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { status } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
