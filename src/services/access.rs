//! Course access control
//!
//! Enrollment and banning rules layered on top of an authenticated user.
//! Within one course a banned user is never also a student or TA; `ban`
//! re-establishes that on every call and the membership insert behind
//! `enroll` refuses banned users in the same statement.

use crate::db::repositories::{CourseRepository, UserRepository};
use crate::models::{Course, CourseRole, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for access control operations
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The user may not perform this action on the course
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced course or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Access control service
pub struct AccessControl {
    course_repo: Arc<dyn CourseRepository>,
    user_repo: Arc<dyn UserRepository>,
    admin_netid: Option<String>,
}

impl AccessControl {
    /// Create the service. `admin_netid` names the only account allowed to ban;
    /// `None` means nobody can.
    pub fn new(
        course_repo: Arc<dyn CourseRepository>,
        user_repo: Arc<dyn UserRepository>,
        admin_netid: Option<String>,
    ) -> Self {
        Self {
            course_repo,
            user_repo,
            admin_netid: admin_netid.filter(|netid| !netid.is_empty()),
        }
    }

    /// Whether `user` is the configured administrator
    pub fn is_admin(&self, user: &User) -> bool {
        self.admin_netid.as_deref() == Some(user.netid.as_str())
    }

    /// Enroll `user` in a course as student or TA.
    ///
    /// Enrolling twice in the same role is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the course does not exist
    /// - `Forbidden` if the user is banned from the course
    pub async fn enroll(
        &self,
        user: &User,
        course_id: i64,
        role: CourseRole,
    ) -> Result<Course, AccessError> {
        let course = self.require_course(course_id).await?;

        let added = self
            .course_repo
            .add_member(course_id, user.id, role.into())
            .await
            .context("Failed to enroll user")?;

        if !added {
            tracing::warn!(user_id = user.id, course_id, "Banned user tried to enroll");
            return Err(AccessError::Forbidden(
                "You are banned from this course".to_string(),
            ));
        }

        tracing::info!(user_id = user.id, course_id, %role, "Enrolled user");
        Ok(course)
    }

    /// Ban `target_user_id` from a course on behalf of `actor`.
    ///
    /// The target loses any student or TA membership in that course.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` is not the administrator (checked first)
    /// - `NotFound` if the course or the target user does not exist
    pub async fn ban(
        &self,
        actor: &User,
        course_id: i64,
        target_user_id: i64,
    ) -> Result<Course, AccessError> {
        if !self.is_admin(actor) {
            tracing::warn!(actor_id = actor.id, course_id, "Non-admin tried to ban");
            return Err(AccessError::Forbidden(
                "Only the administrator may ban users".to_string(),
            ));
        }

        let course = self.require_course(course_id).await?;

        if self
            .user_repo
            .get_by_id(target_user_id)
            .await
            .context("Failed to look up ban target")?
            .is_none()
        {
            return Err(AccessError::NotFound(format!(
                "User {} not found",
                target_user_id
            )));
        }

        self.course_repo
            .ban(course_id, target_user_id)
            .await
            .context("Failed to ban user")?;

        tracing::info!(course_id, target_user_id, "Banned user from course");
        Ok(course)
    }

    async fn require_course(&self, course_id: i64) -> Result<Course, AccessError> {
        self.course_repo
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| AccessError::NotFound(format!("Course {} not found", course_id)))
    }
}
