use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::AuthError,
    models::{MessageResponse, ValidationError},
    repository::RepositoryError,
};

/// ApiError
///
/// Every failure a handler can report. Each variant maps to one status code and
/// a `{"msg": ...}` body; internal details are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400
    #[error("Invalid request body")]
    BadRequest(String),

    // 401
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    // 404
    #[error("Website not found")]
    WebsiteNotFound,
    #[error("Not found")]
    RouteNotFound,

    // 405
    #[error("Method not allowed")]
    MethodNotAllowed,

    // 500
    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::WebsiteNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => tracing::error!("Website error: {}", detail),
            ApiError::BadRequest(detail) => tracing::debug!("Rejected request body: {}", detail),
            _ => {}
        }

        (self.status_code(), Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // An id that cannot be a stored reference cannot name a stored website.
            RepositoryError::MalformedId(_) => ApiError::WebsiteNotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// Logged once, at `error`, when the response is built.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Internal(format!("website rejected by schema: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
