//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] implements `axum::response::IntoResponse`, producing
//! `{ "success": false, "error": { code, message } }` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vantage_graph::GraphError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Component, version or issue not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid version or malformed request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = serde_json::json!({
            "success": false,
            "error": ApiErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match &err {
            GraphError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            GraphError::Core(_) | GraphError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            GraphError::InvariantViolation(_) => {
                tracing::error!(error = %err, "graph invariant violated");
                ApiError::InternalError(err.to_string())
            }
            GraphError::Storage(_) | GraphError::Serialization(_) => {
                tracing::error!(error = %err, "storage failure");
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!(error = %err, "blocking task failed");
        ApiError::InternalError(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::{CoreError, VersionId};

    #[test]
    fn test_graph_errors_map_to_status() {
        let status = |err: GraphError| ApiError::from(err).into_response().status();

        assert_eq!(status(GraphError::not_found("issue", "x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(GraphError::Core(CoreError::InvalidVersion {
                component: "c".into(),
                version: "latest".into(),
                reason: "not a real version".into(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(GraphError::InvalidRequest("no".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(GraphError::invariant(format!("{} has two tails", VersionId::new("c", "1")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
