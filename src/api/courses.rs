//! Course API endpoints
//!
//! Handles HTTP requests for courses and their posts:
//! - GET / and GET /api/courses/ - List courses
//! - POST /api/courses/ - Create course
//! - GET /api/courses/{id}/ - Course with posts and members
//! - DELETE /api/courses/{id}/ - Delete course
//! - POST /api/courses/{id}/post/ - Create post
//! - GET /api/courses/{id}/post/{post_id}/ - Get post
//! - DELETE /api/courses/{id}/post/{post_id}/ - Delete post
//! - POST /api/courses/{id}/ban/ - Ban a user (administrator only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::models::{Course, CourseDetail, CreateCourseInput, Post};

/// Response for course list
#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub courses: Vec<Course>,
}

/// Request body for creating a course
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCourseRequest {
    pub code: String,
    pub name: String,
}

/// Request body for creating a post
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePostRequest {
    pub comment: String,
}

/// Request body for banning a user
#[derive(Debug, Default, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Build public course routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/api/courses/", get(list_courses).post(create_course))
        .route("/api/courses/{id}/", get(get_course).delete(delete_course))
        .route("/api/courses/{id}/post/", post(create_post))
        .route(
            "/api/courses/{id}/post/{post_id}/",
            get(get_post).delete(delete_post),
        )
}

/// Build protected course routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/api/courses/{id}/ban/", post(ban_user))
}

/// GET /api/courses/ - List all courses
async fn list_courses(State(state): State<AppState>) -> Result<Json<CourseListResponse>, ApiError> {
    let courses = state.courses.list().await?;
    Ok(Json(CourseListResponse { courses }))
}

/// POST /api/courses/ - Create a course
async fn create_course(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    let course = state
        .courses
        .create(CreateCourseInput {
            code: body.code,
            name: body.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/courses/{id}/ - Get a course with posts and members
async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CourseDetail>, ApiError> {
    Ok(Json(state.courses.get_detail(id).await?))
}

/// DELETE /api/courses/{id}/ - Delete a course
async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CourseDetail>, ApiError> {
    Ok(Json(state.courses.delete(id).await?))
}

/// POST /api/courses/{id}/post/ - Create a post
async fn create_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = state.courses.create_post(id, body.comment).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/courses/{id}/post/{post_id}/ - Get a post
async fn get_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(i64, i64)>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.courses.get_post(id, post_id).await?))
}

/// DELETE /api/courses/{id}/post/{post_id}/ - Delete a post
async fn delete_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(i64, i64)>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.courses.delete_post(id, post_id).await?))
}

/// POST /api/courses/{id}/ban/ - Ban a user from a course
///
/// Only the configured administrator may call this.
async fn ban_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<BanRequest>,
) -> Result<Json<CourseDetail>, ApiError> {
    let target = body
        .user_id
        .ok_or_else(|| ApiError::validation_error("user_id is required"))?;

    state.access.ban(&actor, id, target).await?;
    Ok(Json(state.courses.get_detail(id).await?))
}
