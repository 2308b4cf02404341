//! Authentication API endpoints
//!
//! Handles HTTP requests for the session lifecycle:
//! - POST /api/register/ - Register and receive a first token pair
//! - POST /login/ - Log in with netid and password
//! - POST /session/ - Trade the update token (bearer) for a new pair
//! - POST /logout/ - Clear the session (session token as bearer)

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{extract_bearer, ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::models::{Profile, SessionTokens};
use crate::services::{LoginInput, RegisterInput};

/// Request body for registration.
///
/// Missing fields deserialize to empty strings and are rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub netid: String,
    pub password: String,
    pub name: String,
    pub college: String,
    pub major: String,
    pub class_year: String,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            netid: req.netid,
            password: req.password,
            profile: Profile {
                name: req.name,
                college: req.college,
                major: req.major,
                class_year: req.class_year,
            },
        }
    }
}

/// Request body for login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub netid: String,
    pub password: String,
}

/// Token pair handed to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub session_token: String,
    pub session_expiration: String,
    pub update_token: String,
}

impl From<SessionTokens> for AuthResponse {
    fn from(tokens: SessionTokens) -> Self {
        Self {
            session_token: tokens.session_token,
            session_expiration: tokens.session_expiration.to_rfc3339(),
            update_token: tokens.update_token,
        }
    }
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/register/", post(register))
        .route("/login/", post(login))
        .route("/session/", post(renew_session))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/logout/", post(logout))
}

/// POST /api/register/ - Register a new account
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state.sessions.register(body.into()).await?;
    Ok(Json(AuthResponse::from(user.tokens())))
}

/// POST /login/ - Log in
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if body.netid.is_empty() || body.password.is_empty() {
        return Err(ApiError::validation_error("netid and password are required"));
    }

    let user = state
        .sessions
        .login(LoginInput {
            netid: body.netid,
            password: body.password,
        })
        .await?;

    Ok(Json(AuthResponse::from(user.tokens())))
}

/// POST /session/ - Renew the token pair
///
/// The update token travels in the Authorization header.
async fn renew_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, ApiError> {
    let update_token = extract_bearer(&headers)?;
    let user = state.sessions.renew(&update_token).await?;
    Ok(Json(AuthResponse::from(user.tokens())))
}

/// POST /logout/ - End the current session
async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.logout(&user).await?;
    Ok(Json(MessageResponse::new("You have successfully logged out")))
}
