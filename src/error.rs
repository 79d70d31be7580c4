//! HTTP-facing error taxonomy.
//!
//! Every failure renders as `{ "success": false, "error": "..." }` with a
//! non-2xx status. The store itself never fails; these errors only come from
//! request decoding and dispatch.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAction(_) | Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-visible message. Internal details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidAction(_) => "Invalid action".to_string(),
            Self::MalformedInput(detail) => detail.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(detail) => tracing::error!(error = %detail, "request failed"),
            Self::InvalidAction(action) => tracing::warn!(%action, "rejected unknown action"),
            Self::MalformedInput(detail) => tracing::debug!(%detail, "rejected malformed input"),
        }
        let body = json!({ "success": false, "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!(error = %err, "request body failed to decode");
        Self::MalformedInput("invalid request body".to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
