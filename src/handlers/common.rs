use crate::errors::ServiceError;
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::debug;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> axum::response::Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Unwraps a JSON body; malformed bodies are the caller's fault (400).
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection.body_text(), "rejected request body");
        ServiceError::ValidationError("Invalid request body".to_string())
    })
}
