//! JSON error responses: `{ "error": ..., "details": ... }`.

use crate::error::RuleCheckError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Status code plus [`ErrorResponse`]; the `Err` side of every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::new(error),
        }
    }

    pub fn bad_request_with(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::with_details(error, details),
        }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse::new(error),
        }
    }

    /// The generic 500 shape; `details` carries a short cause.
    pub fn server_error(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::with_details("Server error", details),
        }
    }
}

impl From<RuleCheckError> for ApiError {
    fn from(e: RuleCheckError) -> Self {
        if e.is_input_error() {
            tracing::warn!("Rejected request: {e}");
            Self::bad_request(e.to_string())
        } else {
            tracing::error!("Request failed: {e}");
            Self::server_error(public_detail(&e))
        }
    }
}

/// The `details` text a client sees for a server-side failure. Variants
/// that carry local paths or internals get a fixed message; the full error
/// is only logged.
fn public_detail(e: &RuleCheckError) -> String {
    match e {
        RuleCheckError::UploadWriteFailed { .. } => "could not store upload".into(),
        RuleCheckError::Internal(_) | RuleCheckError::InvalidConfig(_) => "internal error".into(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
