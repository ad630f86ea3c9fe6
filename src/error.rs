//! Error taxonomy shared by the store, repository and query layers.
//!
//! # Propagation
//! - Capture (write path): errors are logged and counted, never surfaced to
//!   the proxied client.
//! - Query (read path): errors surface as a JSON envelope `{code, message}`
//!   with a stable code and an HTTP status class.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Content type of the JSON error envelope.
pub const ERROR_CONTENT_TYPE: &str = "application/vnd.rrp.error.v1+json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    /// Absent or expired key, list or content.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connect, dial or timeout failure against the backing store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored payload could not be decoded.
    #[error("malformed stored payload: {0}")]
    DecodeError(String),

    /// Missing or invalid parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, RecorderError>;

impl RecorderError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::NotFound(_) => "NOT_FOUND",
            RecorderError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            RecorderError::DecodeError(_) => "DECODE_ERROR",
            RecorderError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// HTTP status the query surface answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RecorderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecorderError::NotFound(_) => StatusCode::NOT_FOUND,
            RecorderError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RecorderError::DecodeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a failed write is worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecorderError::StoreUnavailable(_))
    }
}

impl From<deadpool_redis::PoolError> for RecorderError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        RecorderError::StoreUnavailable(e.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for RecorderError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        RecorderError::StoreUnavailable(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for RecorderError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RecorderError::StoreUnavailable("store operation timed out".to_string())
    }
}

/// Body of every query error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for RecorderError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = ErrorEnvelope {
            code: self.code(),
            message: self.to_string(),
        };
        let mut response = (status, Json(envelope)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(ERROR_CONTENT_TYPE),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(RecorderError::InvalidInput("x".into()).status().is_client_error());
        assert!(RecorderError::NotFound("x".into()).status().is_client_error());
        assert!(RecorderError::StoreUnavailable("x".into()).status().is_server_error());
        assert!(RecorderError::DecodeError("x".into()).status().is_server_error());
    }

    #[test]
    fn only_store_failures_are_transient() {
        assert!(RecorderError::StoreUnavailable("down".into()).is_transient());
        assert!(!RecorderError::DecodeError("bad".into()).is_transient());
        assert!(!RecorderError::NotFound("gone".into()).is_transient());
    }

    #[tokio::test]
    async fn envelope_shape() {
        let response = RecorderError::NotFound("req-1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            ERROR_CONTENT_TYPE
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "not found: req-1");
    }
}
