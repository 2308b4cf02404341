//! Course service
//!
//! Course and post management. Posts carry no author and course content is
//! not guarded by the session layer.

use crate::db::repositories::{CourseRepository, PostRepository};
use crate::models::{
    Course, CourseDetail, CreateCourseInput, CreatePostInput, Membership, Post, UserSummary,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for course service operations
#[derive(Debug, thiserror::Error)]
pub enum CourseServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Course service
pub struct CourseService {
    course_repo: Arc<dyn CourseRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CourseService {
    pub fn new(course_repo: Arc<dyn CourseRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            course_repo,
            post_repo,
        }
    }

    /// All courses, ordered by ID
    pub async fn list(&self) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.course_repo.list().await.context("Failed to list courses")?)
    }

    /// Create a course. Code and name are required.
    pub async fn create(&self, input: CreateCourseInput) -> Result<Course, CourseServiceError> {
        if input.code.trim().is_empty() {
            return Err(CourseServiceError::Validation("code cannot be empty".to_string()));
        }
        if input.name.trim().is_empty() {
            return Err(CourseServiceError::Validation("name cannot be empty".to_string()));
        }

        let course = self
            .course_repo
            .create(&input)
            .await
            .context("Failed to create course")?;

        tracing::info!(course_id = course.id, code = %course.code, "Created course");
        Ok(course)
    }

    /// A course with its posts and its three membership lists
    pub async fn get_detail(&self, course_id: i64) -> Result<CourseDetail, CourseServiceError> {
        let course = self.require_course(course_id).await?;

        let posts = self
            .post_repo
            .list_by_course(course_id)
            .await
            .context("Failed to list posts")?;
        let tas = self.members(course_id, Membership::Ta).await?;
        let students = self.members(course_id, Membership::Student).await?;
        let banned = self.members(course_id, Membership::Banned).await?;

        Ok(CourseDetail {
            course,
            posts,
            tas,
            students,
            banned,
        })
    }

    /// Delete a course along with its posts and memberships.
    ///
    /// Returns the course as it was just before deletion.
    pub async fn delete(&self, course_id: i64) -> Result<CourseDetail, CourseServiceError> {
        let detail = self.get_detail(course_id).await?;
        let deleted = self
            .course_repo
            .delete(course_id)
            .await
            .context("Failed to delete course")?;

        if !deleted {
            return Err(course_not_found(course_id));
        }
        tracing::info!(course_id, "Deleted course");
        Ok(detail)
    }

    /// Create a post in a course
    pub async fn create_post(
        &self,
        course_id: i64,
        comment: String,
    ) -> Result<Post, CourseServiceError> {
        if comment.trim().is_empty() {
            return Err(CourseServiceError::Validation("comment cannot be empty".to_string()));
        }
        self.require_course(course_id).await?;

        let post = self
            .post_repo
            .create(&CreatePostInput { course_id, comment })
            .await
            .context("Failed to create post")?;

        Ok(post)
    }

    /// Get a post through the course it belongs to
    pub async fn get_post(&self, course_id: i64, post_id: i64) -> Result<Post, CourseServiceError> {
        self.require_course(course_id).await?;

        self.post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .filter(|post| post.course_id == course_id)
            .ok_or_else(|| CourseServiceError::NotFound(format!("Post {} not found", post_id)))
    }

    /// Delete a post through the course it belongs to, returning it
    pub async fn delete_post(&self, course_id: i64, post_id: i64) -> Result<Post, CourseServiceError> {
        let post = self.get_post(course_id, post_id).await?;

        self.post_repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?;
        Ok(post)
    }

    async fn members(
        &self,
        course_id: i64,
        membership: Membership,
    ) -> Result<Vec<UserSummary>, CourseServiceError> {
        Ok(self
            .course_repo
            .list_members(course_id, membership)
            .await
            .with_context(|| format!("Failed to list {} members", membership))?)
    }

    async fn require_course(&self, course_id: i64) -> Result<Course, CourseServiceError> {
        self.course_repo
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| course_not_found(course_id))
    }
}

fn course_not_found(course_id: i64) -> CourseServiceError {
    CourseServiceError::NotFound(format!("Course {} not found", course_id))
}
