//! Router error types with HTTP status code mapping.
//!
//! [`RouterError`] is the central error type for the core. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Failures of outbound calls have their own types ([`DeliveryError`],
//! [`HandshakeError`]); those are logged where they happen and never reach
//! an HTTP caller.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: unknown event category: heartbeat"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                   |
/// |-----------|------------|-------------------------------|
/// | 1000–1999 | Validation | 400 Bad Request               |
/// | 3000–3999 | Server     | 500 / 503                     |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// Malformed event or connection request. Nothing was mutated.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The node cannot be configured or cannot identify itself. Fatal at
    /// startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The router has begun shutting down and no longer accepts events.
    #[error("router is shutting down")]
    ShuttingDown,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Internal(_) => 3000,
            Self::Configuration(_) => 3002,
            Self::ShuttingDown => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure of a single outbound event delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Network failure, including the per-request timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The subscriber answered with a non-success status.
    #[error("subscriber rejected delivery with status {status}")]
    Rejected {
        /// Status returned by the subscriber.
        status: StatusCode,
    },

    /// The attempt did not complete within the request timeout.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure of a single handshake attempt.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// Network failure, including the per-request timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer answered, but not with `200 OK`.
    #[error("peer answered {status}: {body}")]
    NotAcknowledged {
        /// Status returned by the peer.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The attempt did not complete within the request timeout.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = RouterError::Validation("bad".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn shutting_down_maps_to_unavailable() {
        assert_eq!(
            RouterError::ShuttingDown.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn into_response_sets_status() {
        let response = RouterError::Configuration("no address".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_are_prefixed_by_kind() {
        let err = RouterError::Validation("unknown event category: x".to_string());
        assert_eq!(err.to_string(), "invalid request: unknown event category: x");
    }
}
