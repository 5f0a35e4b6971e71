//! Authentication extractors.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header};
use std::future::{Ready, ready};
use std::sync::Arc;

use forum_core::domain::AuthenticatedUser;
use forum_core::ports::{AuthError, TokenService};
use forum_shared::ErrorResponse;

use crate::observability::RequestId;

/// Verified caller identity.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, user {}!", identity.user().user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity(AuthenticatedUser);

impl Identity {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.0
    }

    pub fn into_inner(self) -> AuthenticatedUser {
        self.0
    }
}

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError {
    cause: AuthError,
    request_id: Option<String>,
}

impl AuthenticationError {
    fn new(cause: AuthError, req: &HttpRequest) -> Self {
        Self {
            cause,
            request_id: RequestId::of(req),
        }
    }

    fn message(&self) -> String {
        match &self.cause {
            AuthError::TokenExpired => "token expired".to_string(),
            AuthError::InvalidToken(msg) => format!("invalid token: {}", msg),
            AuthError::MissingAuth => "authentication required".to_string(),
        }
    }
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let mut body = ErrorResponse::unauthorized(self.message());
        if let Some(id) = &self.request_id {
            body = body.with_request_id(id.as_str());
        }

        actix_web::HttpResponse::build(self.status_code()).json(body)
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AuthError> {
    let token_service = req
        .app_data::<actix_web::web::Data<Arc<dyn TokenService>>>()
        .ok_or_else(|| {
            tracing::error!("TokenService not found in app data");
            AuthError::InvalidToken("Server configuration error".to_string())
        })?;

    let auth_str = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    token_service.validate_token(token).map(Into::into)
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            authenticate(req)
                .map(Identity)
                .map_err(|cause| AuthenticationError::new(cause, req)),
        )
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<AuthenticatedUser>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}
