//! Course repository
//!
//! Database operations for courses and the `course_memberships` join table
//! that records students, teaching assistants and banned users.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Course, CreateCourseInput, Membership, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Course repository trait
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Create a new course
    async fn create(&self, input: &CreateCourseInput) -> Result<Course>;

    /// Get course by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Course>>;

    /// List all courses ordered by ID
    async fn list(&self) -> Result<Vec<Course>>;

    /// Delete a course (posts and memberships cascade). Returns false if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Add a membership row. Adding an existing row is a no-op.
    ///
    /// Student and TA rows are refused while the user is banned from the
    /// course; the check and the insert are one statement. Returns false if
    /// the ban blocked the insert. Adding a banned row is the same as `ban`.
    async fn add_member(&self, course_id: i64, user_id: i64, membership: Membership)
        -> Result<bool>;

    /// Remove a membership row. Returns false if there was none.
    async fn remove_member(
        &self,
        course_id: i64,
        user_id: i64,
        membership: Membership,
    ) -> Result<bool>;

    /// Whether the user holds the given membership in the course
    async fn has_member(&self, course_id: i64, user_id: i64, membership: Membership)
        -> Result<bool>;

    /// Users holding the given membership in the course, ordered by user ID
    async fn list_members(&self, course_id: i64, membership: Membership)
        -> Result<Vec<UserSummary>>;

    /// Courses the user holds any membership in, banned included
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Course>>;

    /// Atomically drop the user's student and TA rows and add a banned row
    async fn ban(&self, course_id: i64, user_id: i64) -> Result<()>;
}

/// SQLx-based course repository implementation
pub struct SqlxCourseRepository {
    pool: DynDatabasePool,
}

impl SqlxCourseRepository {
    /// Create a new SQLx course repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CourseRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CourseRepository for SqlxCourseRepository {
    async fn create(&self, input: &CreateCourseInput) -> Result<Course> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_course_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_course_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_course_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_course_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Course>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_courses_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_courses_mysql(self.pool.mysql()?).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_COURSE)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_COURSE)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete course")?;
        Ok(affected > 0)
    }

    async fn add_member(
        &self,
        course_id: i64,
        user_id: i64,
        membership: Membership,
    ) -> Result<bool> {
        if membership == Membership::Banned {
            self.ban(course_id, user_id).await?;
            return Ok(true);
        }

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_member_sqlite(self.pool.sqlite()?, course_id, user_id, membership).await
            }
            DatabaseDriver::Mysql => {
                add_member_mysql(self.pool.mysql()?, course_id, user_id, membership).await
            }
        }
        .with_context(|| format!("Failed to add {} to course {}", membership, course_id))
    }

    async fn remove_member(
        &self,
        course_id: i64,
        user_id: i64,
        membership: Membership,
    ) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_MEMBER)
                .bind(course_id)
                .bind(user_id)
                .bind(membership.as_str())
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_MEMBER)
                .bind(course_id)
                .bind(user_id)
                .bind(membership.as_str())
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to remove {} from course {}", membership, course_id))?;
        Ok(affected > 0)
    }

    async fn has_member(
        &self,
        course_id: i64,
        user_id: i64,
        membership: Membership,
    ) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(COUNT_MEMBER)
                .bind(course_id)
                .bind(user_id)
                .bind(membership.as_str())
                .fetch_one(self.pool.sqlite()?)
                .await
                .and_then(|row| row.try_get("count")),
            DatabaseDriver::Mysql => sqlx::query(COUNT_MEMBER)
                .bind(course_id)
                .bind(user_id)
                .bind(membership.as_str())
                .fetch_one(self.pool.mysql()?)
                .await
                .and_then(|row| row.try_get("count")),
        }
        .context("Failed to check course membership")?;
        Ok(count > 0)
    }

    async fn list_members(
        &self,
        course_id: i64,
        membership: Membership,
    ) -> Result<Vec<UserSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_members_sqlite(self.pool.sqlite()?, course_id, membership).await
            }
            DatabaseDriver::Mysql => {
                list_members_mysql(self.pool.mysql()?, course_id, membership).await
            }
        }
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Course>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_courses_for_user_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => list_courses_for_user_mysql(self.pool.mysql()?, user_id).await,
        }
    }

    async fn ban(&self, course_id: i64, user_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => ban_user_sqlite(self.pool.sqlite()?, course_id, user_id).await,
            DatabaseDriver::Mysql => ban_user_mysql(self.pool.mysql()?, course_id, user_id).await,
        }
    }
}

const DELETE_COURSE: &str = "DELETE FROM courses WHERE id = ?";

const INSERT_MEMBER_SQLITE: &str = r#"
    INSERT OR IGNORE INTO course_memberships (course_id, user_id, membership)
    VALUES (?, ?, ?)
"#;

const INSERT_MEMBER_MYSQL: &str = r#"
    INSERT IGNORE INTO course_memberships (course_id, user_id, membership)
    VALUES (?, ?, ?)
"#;

const INSERT_UNLESS_BANNED_SQLITE: &str = r#"
    INSERT OR IGNORE INTO course_memberships (course_id, user_id, membership)
    SELECT ?, ?, ?
    WHERE NOT EXISTS (
        SELECT 1 FROM course_memberships
        WHERE course_id = ? AND user_id = ? AND membership = 'banned'
    )
"#;

const INSERT_UNLESS_BANNED_MYSQL: &str = r#"
    INSERT IGNORE INTO course_memberships (course_id, user_id, membership)
    SELECT ?, ?, ? FROM DUAL
    WHERE NOT EXISTS (
        SELECT 1 FROM course_memberships
        WHERE course_id = ? AND user_id = ? AND membership = 'banned'
    )
"#;

const DELETE_MEMBER: &str =
    "DELETE FROM course_memberships WHERE course_id = ? AND user_id = ? AND membership = ?";

const COUNT_MEMBER: &str = r#"
    SELECT COUNT(*) AS count FROM course_memberships
    WHERE course_id = ? AND user_id = ? AND membership = ?
"#;

const SELECT_MEMBERS: &str = r#"
    SELECT u.id, u.name, u.college, u.major, u.class_year
    FROM users u
    INNER JOIN course_memberships m ON m.user_id = u.id
    WHERE m.course_id = ? AND m.membership = ?
    ORDER BY u.id
"#;

const SELECT_COURSES_FOR_USER: &str = r#"
    SELECT DISTINCT c.id, c.code, c.name, c.created_at
    FROM courses c
    INNER JOIN course_memberships m ON m.course_id = c.id
    WHERE m.user_id = ?
    ORDER BY c.id
"#;

const DELETE_ENROLLMENTS: &str = r#"
    DELETE FROM course_memberships
    WHERE course_id = ? AND user_id = ? AND membership IN ('student', 'ta')
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_course_sqlite(pool: &SqlitePool, input: &CreateCourseInput) -> Result<Course> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO courses (code, name, created_at) VALUES (?, ?, ?)")
        .bind(&input.code)
        .bind(&input.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create course")?;

    Ok(Course {
        id: result.last_insert_rowid(),
        code: input.code.clone(),
        name: input.name.clone(),
        created_at: now,
    })
}

async fn get_course_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Course>> {
    let row = sqlx::query("SELECT id, code, name, created_at FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course by ID")?;

    row.as_ref().map(row_to_course_sqlite).transpose()
}

async fn list_courses_sqlite(pool: &SqlitePool) -> Result<Vec<Course>> {
    let rows = sqlx::query("SELECT id, code, name, created_at FROM courses ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;

    rows.iter().map(row_to_course_sqlite).collect()
}

async fn list_members_sqlite(
    pool: &SqlitePool,
    course_id: i64,
    membership: Membership,
) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(SELECT_MEMBERS)
        .bind(course_id)
        .bind(membership.as_str())
        .fetch_all(pool)
        .await
        .context("Failed to list course members")?;

    rows.iter().map(row_to_summary_sqlite).collect()
}

async fn list_courses_for_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Course>> {
    let rows = sqlx::query(SELECT_COURSES_FOR_USER)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list courses for user")?;

    rows.iter().map(row_to_course_sqlite).collect()
}

async fn add_member_sqlite(
    pool: &SqlitePool,
    course_id: i64,
    user_id: i64,
    membership: Membership,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin membership transaction")?;

    let inserted = sqlx::query(INSERT_UNLESS_BANNED_SQLITE)
        .bind(course_id)
        .bind(user_id)
        .bind(membership.as_str())
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert membership")?
        .rows_affected();

    // Nothing inserted: either the row already existed or a ban blocked it
    let banned = if inserted == 0 {
        let count: i64 = sqlx::query(COUNT_MEMBER)
            .bind(course_id)
            .bind(user_id)
            .bind(Membership::Banned.as_str())
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("count"))
            .context("Failed to check ban status")?;
        count > 0
    } else {
        false
    };

    tx.commit().await.context("Failed to commit membership transaction")?;
    Ok(!banned)
}

async fn ban_user_sqlite(pool: &SqlitePool, course_id: i64, user_id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin ban transaction")?;

    sqlx::query(DELETE_ENROLLMENTS)
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to remove enrollments")?;

    sqlx::query(INSERT_MEMBER_SQLITE)
        .bind(course_id)
        .bind(user_id)
        .bind(Membership::Banned.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to insert ban")?;

    tx.commit().await.context("Failed to commit ban transaction")?;
    Ok(())
}

fn row_to_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Course> {
    Ok(Course {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_summary_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UserSummary> {
    Ok(UserSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        college: row.try_get("college")?,
        major: row.try_get("major")?,
        class_year: row.try_get("class_year")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_course_mysql(pool: &MySqlPool, input: &CreateCourseInput) -> Result<Course> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO courses (code, name, created_at) VALUES (?, ?, ?)")
        .bind(&input.code)
        .bind(&input.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create course")?;

    Ok(Course {
        id: result.last_insert_id() as i64,
        code: input.code.clone(),
        name: input.name.clone(),
        created_at: now,
    })
}

async fn get_course_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Course>> {
    let row = sqlx::query("SELECT id, code, name, created_at FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course by ID")?;

    row.as_ref().map(row_to_course_mysql).transpose()
}

async fn list_courses_mysql(pool: &MySqlPool) -> Result<Vec<Course>> {
    let rows = sqlx::query("SELECT id, code, name, created_at FROM courses ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;

    rows.iter().map(row_to_course_mysql).collect()
}

async fn list_members_mysql(
    pool: &MySqlPool,
    course_id: i64,
    membership: Membership,
) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(SELECT_MEMBERS)
        .bind(course_id)
        .bind(membership.as_str())
        .fetch_all(pool)
        .await
        .context("Failed to list course members")?;

    rows.iter().map(row_to_summary_mysql).collect()
}

async fn list_courses_for_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Course>> {
    let rows = sqlx::query(SELECT_COURSES_FOR_USER)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list courses for user")?;

    rows.iter().map(row_to_course_mysql).collect()
}

async fn add_member_mysql(
    pool: &MySqlPool,
    course_id: i64,
    user_id: i64,
    membership: Membership,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin membership transaction")?;

    let inserted = sqlx::query(INSERT_UNLESS_BANNED_MYSQL)
        .bind(course_id)
        .bind(user_id)
        .bind(membership.as_str())
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert membership")?
        .rows_affected();

    let banned = if inserted == 0 {
        let count: i64 = sqlx::query(COUNT_MEMBER)
            .bind(course_id)
            .bind(user_id)
            .bind(Membership::Banned.as_str())
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("count"))
            .context("Failed to check ban status")?;
        count > 0
    } else {
        false
    };

    tx.commit().await.context("Failed to commit membership transaction")?;
    Ok(!banned)
}

async fn ban_user_mysql(pool: &MySqlPool, course_id: i64, user_id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin ban transaction")?;

    sqlx::query(DELETE_ENROLLMENTS)
        .bind(course_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to remove enrollments")?;

    sqlx::query(INSERT_MEMBER_MYSQL)
        .bind(course_id)
        .bind(user_id)
        .bind(Membership::Banned.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to insert ban")?;

    tx.commit().await.context("Failed to commit ban transaction")?;
    Ok(())
}

fn row_to_course_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Course> {
    Ok(Course {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_summary_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UserSummary> {
    Ok(UserSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        college: row.try_get("college")?,
        major: row.try_get("major")?,
        class_year: row.try_get("class_year")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Profile, User};

    async fn setup_test_repo() -> (SqlxCourseRepository, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxCourseRepository::new(pool.clone()),
            SqlxUserRepository::new(pool),
        )
    }

    async fn create_test_user(users: &SqlxUserRepository, netid: &str) -> i64 {
        let profile = Profile {
            name: netid.to_uppercase(),
            college: "Arts".to_string(),
            major: "History".to_string(),
            class_year: "2025".to_string(),
        };
        users
            .create(&User::new(netid.to_string(), profile, "hash".to_string()))
            .await
            .expect("Failed to create user")
            .id
    }

    fn course_input(code: &str) -> CreateCourseInput {
        CreateCourseInput {
            code: code.to_string(),
            name: format!("Course {}", code),
        }
    }

    #[tokio::test]
    async fn test_create_get_list_course() {
        let (courses, _) = setup_test_repo().await;

        let a = courses.create(&course_input("CS 1110")).await.expect("Failed to create course");
        let b = courses.create(&course_input("CS 2110")).await.expect("Failed to create course");

        let found = courses.get_by_id(a.id).await.unwrap().expect("Course not found");
        assert_eq!(found.code, "CS 1110");

        let all = courses.list().await.unwrap();
        assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);

        assert!(courses.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_course_cascades_memberships() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;
        courses.add_member(course.id, user_id, Membership::Student).await.unwrap();

        assert!(courses.delete(course.id).await.unwrap());
        assert!(!courses.delete(course.id).await.unwrap());
        assert!(courses.list_for_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;

        courses.add_member(course.id, user_id, Membership::Ta).await.unwrap();
        courses.add_member(course.id, user_id, Membership::Ta).await.unwrap();

        let tas = courses.list_members(course.id, Membership::Ta).await.unwrap();
        assert_eq!(tas.len(), 1);
        assert_eq!(tas[0].id, user_id);
        assert!(courses.has_member(course.id, user_id, Membership::Ta).await.unwrap());
        assert!(!courses.has_member(course.id, user_id, Membership::Student).await.unwrap());
    }

    #[tokio::test]
    async fn test_student_and_ta_sets_are_independent() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;

        courses.add_member(course.id, user_id, Membership::Student).await.unwrap();
        courses.add_member(course.id, user_id, Membership::Ta).await.unwrap();

        assert_eq!(courses.list_members(course.id, Membership::Student).await.unwrap().len(), 1);
        assert_eq!(courses.list_members(course.id, Membership::Ta).await.unwrap().len(), 1);
        assert!(courses.list_members(course.id, Membership::Banned).await.unwrap().is_empty());
        // Listed once even with two memberships
        assert_eq!(courses.list_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_member() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;
        courses.add_member(course.id, user_id, Membership::Student).await.unwrap();

        assert!(courses.remove_member(course.id, user_id, Membership::Student).await.unwrap());
        assert!(!courses.remove_member(course.id, user_id, Membership::Student).await.unwrap());
    }

    #[tokio::test]
    async fn test_ban_moves_user_to_banned_only() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let other = courses.create(&course_input("CS 2110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;
        courses.add_member(course.id, user_id, Membership::Student).await.unwrap();
        courses.add_member(course.id, user_id, Membership::Ta).await.unwrap();
        courses.add_member(other.id, user_id, Membership::Student).await.unwrap();

        courses.ban(course.id, user_id).await.expect("Failed to ban");
        courses.ban(course.id, user_id).await.expect("Banning twice should succeed");

        assert!(courses.has_member(course.id, user_id, Membership::Banned).await.unwrap());
        assert!(!courses.has_member(course.id, user_id, Membership::Student).await.unwrap());
        assert!(!courses.has_member(course.id, user_id, Membership::Ta).await.unwrap());
        // Other courses are untouched
        assert!(courses.has_member(other.id, user_id, Membership::Student).await.unwrap());

        let for_user = courses.list_for_user(user_id).await.unwrap();
        assert_eq!(for_user.iter().map(|c| c.id).collect::<Vec<_>>(), vec![course.id, other.id]);
    }

    #[tokio::test]
    async fn test_add_member_refuses_banned_user() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let user_id = create_test_user(&users, "abc1").await;
        courses.ban(course.id, user_id).await.unwrap();

        assert!(!courses.add_member(course.id, user_id, Membership::Student).await.unwrap());
        assert!(!courses.add_member(course.id, user_id, Membership::Ta).await.unwrap());
        assert!(!courses.has_member(course.id, user_id, Membership::Student).await.unwrap());
        assert!(!courses.has_member(course.id, user_id, Membership::Ta).await.unwrap());

        // Re-adding an existing row still reports success
        let other = create_test_user(&users, "abc2").await;
        assert!(courses.add_member(course.id, other, Membership::Student).await.unwrap());
        assert!(courses.add_member(course.id, other, Membership::Student).await.unwrap());

        // A banned row goes through the ban path and clears enrollments
        assert!(courses.add_member(course.id, other, Membership::Banned).await.unwrap());
        assert!(!courses.has_member(course.id, other, Membership::Student).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_members_ordered_by_user_id() {
        let (courses, users) = setup_test_repo().await;
        let course = courses.create(&course_input("CS 1110")).await.unwrap();
        let first = create_test_user(&users, "abc1").await;
        let second = create_test_user(&users, "abc2").await;

        courses.add_member(course.id, second, Membership::Student).await.unwrap();
        courses.add_member(course.id, first, Membership::Student).await.unwrap();

        let students = courses.list_members(course.id, Membership::Student).await.unwrap();
        assert_eq!(students.iter().map(|s| s.id).collect::<Vec<_>>(), vec![first, second]);
        assert_eq!(students[0].name, "ABC1");
    }
}
