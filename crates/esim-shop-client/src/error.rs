//! Client error types.

use std::collections::BTreeMap;

/// Errors that can occur when using the eSIM shop client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The requested resource does not exist for this session.
    #[error("not found: {0}")]
    NotFound(String),

    /// Some fields were rejected.
    #[error("validation failed: {} field(s)", .0.len())]
    Validation(BTreeMap<String, String>),

    /// The card was declined.
    #[error("payment declined: {reason}")]
    Declined {
        /// Gateway reason.
        reason: String,
    },

    /// The checkout is not in a state that allows the request.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
