//! API middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - The JSON error type and its mapping from service errors
//! - Bearer token extraction and the authentication gate

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{SqlxCourseRepository, SqlxPostRepository, SqlxUserRepository};
use crate::db::DynDatabasePool;
use crate::models::{InvalidRole, User};
use crate::services::{
    AccessControl, AccessError, CourseService, CourseServiceError, PasswordHasher, SessionError,
    SessionManager, UserService, UserServiceError,
};

/// Message for every rejected credential, whatever the cause
const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing session token";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub access: Arc<AccessControl>,
    pub courses: Arc<CourseService>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let course_repo = SqlxCourseRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool);

        let hasher = PasswordHasher::new(&config.auth.password)?;
        let sessions = SessionManager::new(user_repo.clone(), hasher, &config.auth);
        let access = AccessControl::new(
            course_repo.clone(),
            user_repo.clone(),
            config.auth.admin_netid.clone(),
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            access: Arc::new(access),
            courses: Arc::new(CourseService::new(course_repo.clone(), post_repo)),
            users: Arc::new(UserService::new(user_repo, course_repo)),
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
    }
}

/// JSON body extractor whose rejections use the `ApiError` shape
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal_error(cause: &anyhow::Error) -> Self {
        tracing::error!(error = ?cause, "Internal error");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(msg) => ApiError::validation_error(msg),
            SessionError::Conflict(msg) => ApiError::conflict(msg),
            SessionError::Unauthorized => ApiError::unauthorized(UNAUTHORIZED_MESSAGE),
            SessionError::Internal(e) => ApiError::internal_error(&e),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Forbidden(msg) => ApiError::forbidden(msg),
            AccessError::NotFound(msg) => ApiError::not_found(msg),
            AccessError::Internal(e) => ApiError::internal_error(&e),
        }
    }
}

impl From<CourseServiceError> for ApiError {
    fn from(err: CourseServiceError) -> Self {
        match err {
            CourseServiceError::Validation(msg) => ApiError::validation_error(msg),
            CourseServiceError::NotFound(msg) => ApiError::not_found(msg),
            CourseServiceError::Internal(e) => ApiError::internal_error(&e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(msg) => ApiError::validation_error(msg),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::Internal(e) => ApiError::internal_error(&e),
        }
    }
}

impl From<InvalidRole> for ApiError {
    fn from(err: InvalidRole) -> Self {
        ApiError::validation_error(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<BearerError> for ApiError {
    fn from(_: BearerError) -> Self {
        ApiError::unauthorized(UNAUTHORIZED_MESSAGE)
    }
}

// ============================================================================
// Bearer tokens
// ============================================================================

/// Why no token could be read from a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("Missing authorization header")]
    MissingHeader,
    #[error("Invalid authorization header")]
    InvalidHeader,
}

/// Read the token from the Authorization header.
///
/// A leading literal `Bearer` and surrounding whitespace are stripped; a value
/// without the prefix is taken as the token itself.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::MissingHeader)?
        .to_str()
        .map_err(|_| BearerError::InvalidHeader)?
        .trim();

    let token = value.strip_prefix("Bearer").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(BearerError::InvalidHeader);
    }
    Ok(token.to_string())
}

/// Resolve the request's bearer session token to a user.
///
/// Missing header, malformed header, unknown token and expired token are
/// all the same 401.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = extract_bearer(headers).map_err(|e| {
        tracing::debug!(reason = %e, "Rejected request credentials");
        ApiError::from(e)
    })?;

    state
        .sessions
        .verify(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any hex token survives a round trip through the header
        #[test]
        fn prop_bearer_roundtrip(token in "[0-9a-f]{1,128}", pad in " {0,4}") {
            let mut headers = HeaderMap::new();
            let value = format!("Bearer{}{}{}", pad, token, pad);
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

            prop_assert_eq!(extract_bearer(&headers), Ok(token));
        }

        /// Whitespace-only remainders are always rejected
        #[test]
        fn prop_blank_bearer_rejected(pad in "[ \t]{0,8}") {
            let mut headers = HeaderMap::new();
            let value = format!("Bearer{}", pad);
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

            prop_assert_eq!(extract_bearer(&headers), Err(BearerError::InvalidHeader));
        }
    }
}
