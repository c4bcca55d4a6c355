//! Maps `VibinError` onto HTTP responses, per spec.md §7:
//! `NotFound` -> 404, `InputError` -> 400, `DeviceError`/`MediaServerError`
//! -> 503, `MissingDependencyError` -> 404, everything else -> 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vibin_core::VibinError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct ApiError(pub VibinError);

impl From<VibinError> for ApiError {
    fn from(err: VibinError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VibinError::NotFound(_) => StatusCode::NOT_FOUND,
            VibinError::InputError(_) => StatusCode::BAD_REQUEST,
            VibinError::DeviceError(_) | VibinError::MediaServerError(_) => StatusCode::SERVICE_UNAVAILABLE,
            VibinError::MissingDependencyError(_) => StatusCode::NOT_FOUND,
            VibinError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
