//! Structured API error responses: a stable machine-readable code plus a
//! human-readable message, mapped onto conventional status classes.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::engine::error::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidRequest,
    NotFound,
    StoreUnavailable,
    Internal,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

/// Log a store failure with context and hide the details from the client.
pub fn db_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    warn!(error = %e, "{context} failed");
    ApiError::new(ApiErrorCode::Internal, "Internal error")
}

/// Map a job failure onto the API surface.
pub fn job_error(context: &str, e: JobError) -> ApiError {
    match e {
        JobError::Config(message) => ApiError::new(ApiErrorCode::InvalidRequest, message),
        JobError::TransientIo { .. } => {
            warn!(error = %e, "{context} failed");
            ApiError::new(
                ApiErrorCode::StoreUnavailable,
                "Store unavailable, try again later",
            )
        }
        JobError::Cancelled => ApiError::new(ApiErrorCode::StoreUnavailable, "Job cancelled"),
        JobError::UpsertConflict(_) => {
            warn!(error = %e, "{context} failed");
            ApiError::new(ApiErrorCode::Internal, "Internal error")
        }
    }
}
