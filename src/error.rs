// Error handling module
// Defines the client error taxonomy shared by the API client, pipeline and services

use thiserror::Error;

/// Errors that can occur while talking to the event planner API
///
/// `Clone` so a single refresh outcome can be handed to every request
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Network-level failure before a response was received
    #[error("Transport error ({kind}): {message}")]
    Transport { kind: &'static str, message: String },

    /// Non-2xx response from the backend
    #[error("HTTP error: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    /// 2xx response whose envelope reported `success: false`
    #[error("API error: {message}")]
    Api { message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Session storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request could not be built
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Categorize a reqwest error the same way for every call site
    pub(crate) fn from_transport(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        ClientError::Transport {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(e: rusqlite::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
