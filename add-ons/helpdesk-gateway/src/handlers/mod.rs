//! HTTP handlers and the JSON error body shared by them.

pub mod chat;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Client-facing generic failure text; details only go to the server log.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An error occurred processing your message. Please try again.";

/// Errors rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string()),
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
