//! Errors the gate answers on behalf of the upstream.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message sent with every rate-limit rejection.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Errors rendered as `{ "error": "<message>" }` JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Too many requests. Please try again later.")]
    RateLimited,
    /// Upstream could not be reached; the detail is logged, not sent.
    #[error("Upstream request failed")]
    Upstream(String),
}

impl GateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GateError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        if let GateError::Upstream(detail) = &self {
            tracing::debug!(detail = %detail, "Answering upstream failure with 502");
        }
        // No Retry-After: the limiter does not expose when a window ends.
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
