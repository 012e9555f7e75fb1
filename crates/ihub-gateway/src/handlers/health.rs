//! Health check endpoint.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::Envelope;

/// Health check handler.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {"code": 0, "message": "ok", "data": ""}
/// ```
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(Envelope::ok("ok", "")))
}
