//! HTTP error mapping for the console surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use erpsync_domain::SyncError;
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "RUN_IN_FLIGHT", message)
    }
}

/// Status code and stable error code for a domain error.
pub fn status_for(err: &SyncError) -> (StatusCode, &'static str) {
    match err {
        SyncError::Config(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CONFIG_ERROR"),
        SyncError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        SyncError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SyncError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        SyncError::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
        SyncError::Auth(_) => (StatusCode::BAD_GATEWAY, "ERP_AUTH_ERROR"),
        SyncError::MalformedRecord(_) => (StatusCode::BAD_GATEWAY, "MALFORMED_RECORD"),
        SyncError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        SyncError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let (status, code) = status_for(&err);
        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { code: self.code.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
