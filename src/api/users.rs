//! User API endpoints
//!
//! - GET /api/user/{id}/ - Public profile with courses
//! - POST /api/user/edit/ - Edit own profile
//! - POST /api/user/{id}/add/ - Enroll as student or TA

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::auth::MessageResponse;
use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::models::{CourseDetail, CourseRole, UpdateProfileInput};
use crate::services::UserProfile;

/// Request body for profile edits; omitted fields keep their value
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub college: Option<String>,
    pub major: Option<String>,
    pub class_year: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateProfileInput {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            name: req.name,
            college: req.college,
            major: req.major,
            class_year: req.class_year,
        }
    }
}

/// Request body for enrollment
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnrollRequest {
    #[serde(rename = "type")]
    pub role: String,
}

/// Build public user routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/user/{id}/", get(get_user))
}

/// Build protected user routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/api/user/edit/", post(update_profile))
        .route("/api/user/{id}/add/", post(enroll))
}

/// GET /api/user/{id}/ - Get a user's profile
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.users.get_profile(id).await?))
}

/// POST /api/user/edit/ - Update the caller's profile
async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.update_profile(&user, body.into()).await?;
    Ok(Json(MessageResponse::new("Profile updated")))
}

/// POST /api/user/{id}/add/ - Enroll the caller in a course
async fn enroll(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(course_id): Path<i64>,
    ApiJson(body): ApiJson<EnrollRequest>,
) -> Result<Json<CourseDetail>, ApiError> {
    let role = CourseRole::from_str(&body.role)?;

    state.access.enroll(&user, course_id, role).await?;
    Ok(Json(state.courses.get_detail(course_id).await?))
}
