//! User service
//!
//! Public profiles and profile edits. Credentials and session fields are
//! handled by the session manager, never here.

use crate::db::repositories::{CourseRepository, UserRepository};
use crate::models::{Course, UpdateProfileInput, User, UserSummary};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// A provided field is empty
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A user's public profile together with every course they are attached to
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub netid: String,
    pub courses: Vec<Course>,
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    course_repo: Arc<dyn CourseRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, course_repo: Arc<dyn CourseRepository>) -> Self {
        Self {
            user_repo,
            course_repo,
        }
    }

    /// Profile of a user by ID
    pub async fn get_profile(&self, user_id: i64) -> Result<UserProfile, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {} not found", user_id)))?;

        self.profile_of(&user).await
    }

    /// Apply a partial profile edit to `user`.
    ///
    /// Omitted fields keep their value. Provided fields must be non-empty;
    /// nothing is written if any of them is.
    pub async fn update_profile(
        &self,
        user: &User,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, UserServiceError> {
        let mut updated = user.clone();
        for (field, value, target) in [
            ("name", input.name, &mut updated.name),
            ("college", input.college, &mut updated.college),
            ("major", input.major, &mut updated.major),
            ("class_year", input.class_year, &mut updated.class_year),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(UserServiceError::Validation(format!(
                        "{} cannot be empty",
                        field
                    )));
                }
                *target = value;
            }
        }

        let saved = self
            .user_repo
            .update_profile(&updated)
            .await
            .context("Failed to update profile")?;

        tracing::info!(user_id = saved.id, "Updated profile");
        self.profile_of(&saved).await
    }

    async fn profile_of(&self, user: &User) -> Result<UserProfile, UserServiceError> {
        let courses = self
            .course_repo
            .list_for_user(user.id)
            .await
            .context("Failed to list user courses")?;

        Ok(UserProfile {
            user: UserSummary::from(user),
            netid: user.netid.clone(),
            courses,
        })
    }
}
