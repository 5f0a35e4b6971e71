//! Error handling - maps failures onto `{status, msg}` responses.

use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use forum_core::error::{DomainError, RepoError};
use forum_shared::ErrorResponse;
use std::fmt;

use crate::observability::RequestId;

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    MethodNotAllowed,
    TooManyRequests,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
            AppError::TooManyRequests => write!(f, "Too many requests"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    fn body(&self) -> ErrorResponse {
        match self {
            AppError::BadRequest(msg) => ErrorResponse::bad_request(msg),
            AppError::Unauthorized(msg) => ErrorResponse::unauthorized(msg),
            AppError::NotFound(msg) => ErrorResponse::not_found(msg),
            AppError::MethodNotAllowed => ErrorResponse::method_not_allowed(),
            AppError::TooManyRequests => ErrorResponse::too_many_requests("too many requests"),
            AppError::Internal(detail) => {
                // The cause stays in the logs
                tracing::error!(error = %detail, "Internal error");
                ErrorResponse::internal_error()
            }
        }
    }

    /// Render the error with the request's ID attached.
    pub fn respond_to(&self, req: &HttpRequest) -> HttpResponse {
        let mut body = self.body();
        if let Some(id) = RequestId::of(req) {
            body = body.with_request_id(id);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, .. } => {
                AppError::NotFound(format!("{} not found", entity_type))
            }
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Unauthorized => AppError::Unauthorized("unauthorized".to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("resource not found".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
