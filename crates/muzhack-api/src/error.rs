//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use muzhack_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal failure whose details were withheld from the client.
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Hide internal error details in production; the kind stays visible.
    pub fn redacted(self, production: bool) -> Self {
        if production && self.is_internal() {
            Self::internal("An internal error occurred")
        } else {
            self
        }
    }

    /// Error kind reported to clients as `code`.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "InvalidJob",
            ApiError::Internal(_) => "InternalError",
            ApiError::Worker(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Worker(e) => match e {
                WorkerError::InvalidJob(_) => StatusCode::BAD_REQUEST,
                WorkerError::DuplicateJob(_) | WorkerError::WorkspaceConflict(_) => StatusCode::CONFLICT,
                WorkerError::InvalidImage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                WorkerError::Fetch(_) | WorkerError::Upload(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.code() == "InternalError"
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
