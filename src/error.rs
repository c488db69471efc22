use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    // Connection errors
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Send timed out after {0:?}")]
    SendTimeout(Duration),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    // Relay lifecycle
    #[error("Broadcast queue closed")]
    QueueClosed,

    #[error("Relay is shutting down")]
    ShuttingDown,

    // Handshake errors
    #[error("Origin not allowed: {origin}")]
    OriginRejected { origin: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RelayError::MalformedPayload(_) | RelayError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }

            // 403 Forbidden
            RelayError::OriginRejected { .. } => StatusCode::FORBIDDEN,

            // 503 Service Unavailable
            RelayError::ShuttingDown | RelayError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            RelayError::SendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            RelayError::ConnectionClosed
            | RelayError::Transport(_)
            | RelayError::Io(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Whether the error means the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RelayError::ConnectionClosed)
    }
}

// Handshake rejections are the only errors that reach an HTTP response
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<axum::Error> for RelayError {
    fn from(err: axum::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}
