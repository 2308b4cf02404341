//! Post repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreatePostInput, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Posts of a course, oldest first
    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Post>>;

    /// Delete a post. Returns false if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_POST_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_POST_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(SELECT_POSTS_BY_COURSE)
                    .bind(course_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(SELECT_POSTS_BY_COURSE)
                    .bind(course_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete post")?;
        Ok(affected > 0)
    }
}

const SELECT_POST_BY_ID: &str = "SELECT id, course_id, comment, created_at FROM posts WHERE id = ?";

const SELECT_POSTS_BY_COURSE: &str =
    "SELECT id, course_id, comment, created_at FROM posts WHERE course_id = ? ORDER BY id";

const INSERT_POST: &str = "INSERT INTO posts (course_id, comment, created_at) VALUES (?, ?, ?)";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(input.course_id)
        .bind(&input.comment)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        course_id: input.course_id,
        comment: input.comment.clone(),
        created_at: now,
    })
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(input.course_id)
        .bind(&input.comment)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        course_id: input.course_id,
        comment: input.comment.clone(),
        created_at: now,
    })
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CourseRepository, SqlxCourseRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateCourseInput;

    async fn setup_test_repo() -> (SqlxPostRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let course = SqlxCourseRepository::new(pool.clone())
            .create(&CreateCourseInput {
                code: "CS 1110".to_string(),
                name: "Intro".to_string(),
            })
            .await
            .expect("Failed to create course");

        (SqlxPostRepository::new(pool), course.id)
    }

    fn post_input(course_id: i64, comment: &str) -> CreatePostInput {
        CreatePostInput {
            course_id,
            comment: comment.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (repo, course_id) = setup_test_repo().await;

        let post = repo.create(&post_input(course_id, "Hello")).await.expect("Failed to create post");
        let found = repo.get_by_id(post.id).await.unwrap().expect("Post not found");

        assert_eq!(found.course_id, course_id);
        assert_eq!(found.comment, "Hello");
    }

    #[tokio::test]
    async fn test_create_post_for_missing_course_fails() {
        let (repo, _) = setup_test_repo().await;
        assert!(repo.create(&post_input(9999, "orphan")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_course_in_order() {
        let (repo, course_id) = setup_test_repo().await;
        repo.create(&post_input(course_id, "first")).await.unwrap();
        repo.create(&post_input(course_id, "second")).await.unwrap();

        let posts = repo.list_by_course(course_id).await.unwrap();
        let comments: Vec<_> = posts.iter().map(|p| p.comment.as_str()).collect();
        assert_eq!(comments, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (repo, course_id) = setup_test_repo().await;
        let post = repo.create(&post_input(course_id, "bye")).await.unwrap();

        assert!(repo.delete(post.id).await.unwrap());
        assert!(!repo.delete(post.id).await.unwrap());
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }
}
