//! User repository
//!
//! Database operations for users and their session fields.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Empty tokens are written as NULL and read back as empty strings, so the
//! UNIQUE constraints on the token columns only ever see live tokens.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{SessionTokens, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user, session fields included
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by netid (exact match)
    async fn get_by_netid(&self, netid: &str) -> Result<Option<User>>;

    /// Get user by session token (exact match, never matches the empty token)
    async fn get_by_session_token(&self, token: &str) -> Result<Option<User>>;

    /// Get user by update token (exact match, never matches the empty token)
    async fn get_by_update_token(&self, token: &str) -> Result<Option<User>>;

    /// Persist the profile fields of a user
    async fn update_profile(&self, user: &User) -> Result<User>;

    /// Overwrite the session fields of a user with the given pair
    async fn update_session(&self, user_id: i64, tokens: &SessionTokens) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: LookupColumn, value: &str) -> Result<Option<User>> {
        if value.is_empty() {
            return Ok(None);
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(self.pool.sqlite()?, column, value).await
            }
            DatabaseDriver::Mysql => {
                find_user_mysql(self.pool.mysql()?, column, value).await
            }
        }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_netid(&self, netid: &str) -> Result<Option<User>> {
        self.find_one(LookupColumn::Netid, netid).await
    }

    async fn get_by_session_token(&self, token: &str) -> Result<Option<User>> {
        self.find_one(LookupColumn::SessionToken, token).await
    }

    async fn get_by_update_token(&self, token: &str) -> Result<Option<User>> {
        self.find_one(LookupColumn::UpdateToken, token).await
    }

    async fn update_profile(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_profile_sqlite(self.pool.sqlite()?, user).await
            }
            DatabaseDriver::Mysql => {
                update_profile_mysql(self.pool.mysql()?, user).await
            }
        }
    }

    async fn update_session(&self, user_id: i64, tokens: &SessionTokens) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_session_sqlite(self.pool.sqlite()?, user_id, tokens).await
            }
            DatabaseDriver::Mysql => {
                update_session_mysql(self.pool.mysql()?, user_id, tokens).await
            }
        }
    }
}

/// Columns a user can be looked up by
#[derive(Debug, Clone, Copy)]
enum LookupColumn {
    Netid,
    SessionToken,
    UpdateToken,
}

impl LookupColumn {
    fn select_sql(self) -> &'static str {
        match self {
            LookupColumn::Netid => SELECT_BY_NETID,
            LookupColumn::SessionToken => SELECT_BY_SESSION_TOKEN,
            LookupColumn::UpdateToken => SELECT_BY_UPDATE_TOKEN,
        }
    }
}

/// Full-row user SELECT with the given WHERE clause
macro_rules! select_user {
    ($filter:literal) => {
        concat!(
            "SELECT id, netid, name, college, major, class_year, password_hash, ",
            "session_token, session_expiration, update_token, created_at, updated_at ",
            "FROM users WHERE ",
            $filter
        )
    };
}

const SELECT_BY_ID: &str = select_user!("id = ?");
const SELECT_BY_NETID: &str = select_user!("netid = ?");
const SELECT_BY_SESSION_TOKEN: &str = select_user!("session_token = ?");
const SELECT_BY_UPDATE_TOKEN: &str = select_user!("update_token = ?");

const INSERT_USER: &str = r#"
    INSERT INTO users (netid, name, college, major, class_year, password_hash,
                       session_token, session_expiration, update_token, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_PROFILE: &str = r#"
    UPDATE users
    SET name = ?, college = ?, major = ?, class_year = ?, updated_at = ?
    WHERE id = ?
"#;

const UPDATE_SESSION: &str = r#"
    UPDATE users
    SET session_token = ?, session_expiration = ?, update_token = ?, updated_at = ?
    WHERE id = ?
"#;

/// Stored form of a token: NULL when cleared
fn token_column(token: &str) -> Option<&str> {
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(&user.netid)
        .bind(&user.name)
        .bind(&user.college)
        .bind(&user.major)
        .bind(&user.class_year)
        .bind(&user.password_hash)
        .bind(token_column(&user.session_token))
        .bind(user.session_expiration)
        .bind(token_column(&user.update_token))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn find_user_sqlite(
    pool: &SqlitePool,
    column: LookupColumn,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(column.select_sql())
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {:?}", column))?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_profile_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(UPDATE_PROFILE)
        .bind(&user.name)
        .bind(&user.college)
        .bind(&user.major)
        .bind(&user.class_year)
        .bind(Utc::now())
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn update_session_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    tokens: &SessionTokens,
) -> Result<()> {
    let result = sqlx::query(UPDATE_SESSION)
        .bind(token_column(&tokens.session_token))
        .bind(tokens.session_expiration)
        .bind(token_column(&tokens.update_token))
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user session")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("User {} not found for session update", user_id);
    }
    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        netid: row.try_get("netid")?,
        name: row.try_get("name")?,
        college: row.try_get("college")?,
        major: row.try_get("major")?,
        class_year: row.try_get("class_year")?,
        password_hash: row.try_get("password_hash")?,
        session_token: row
            .try_get::<Option<String>, _>("session_token")?
            .unwrap_or_default(),
        session_expiration: row.try_get("session_expiration")?,
        update_token: row
            .try_get::<Option<String>, _>("update_token")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(&user.netid)
        .bind(&user.name)
        .bind(&user.college)
        .bind(&user.major)
        .bind(&user.class_year)
        .bind(&user.password_hash)
        .bind(token_column(&user.session_token))
        .bind(user.session_expiration)
        .bind(token_column(&user.update_token))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn find_user_mysql(
    pool: &MySqlPool,
    column: LookupColumn,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(column.select_sql())
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {:?}", column))?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_profile_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(UPDATE_PROFILE)
        .bind(&user.name)
        .bind(&user.college)
        .bind(&user.major)
        .bind(&user.class_year)
        .bind(Utc::now())
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;

    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn update_session_mysql(
    pool: &MySqlPool,
    user_id: i64,
    tokens: &SessionTokens,
) -> Result<()> {
    sqlx::query(UPDATE_SESSION)
        .bind(token_column(&tokens.session_token))
        .bind(tokens.session_expiration)
        .bind(token_column(&tokens.update_token))
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user session")?;

    // MySQL reports matched-but-unchanged rows as 0 affected, so existence is checked separately
    if get_user_by_id_mysql(pool, user_id).await?.is_none() {
        anyhow::bail!("User {} not found for session update", user_id);
    }
    Ok(())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        netid: row.try_get("netid")?,
        name: row.try_get("name")?,
        college: row.try_get("college")?,
        major: row.try_get("major")?,
        class_year: row.try_get("class_year")?,
        password_hash: row.try_get("password_hash")?,
        session_token: row
            .try_get::<Option<String>, _>("session_token")?
            .unwrap_or_default(),
        session_expiration: row.try_get("session_expiration")?,
        update_token: row
            .try_get::<Option<String>, _>("update_token")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};
    use crate::models::Profile;
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(netid: &str, token: &str) -> User {
        let profile = Profile {
            name: format!("User {}", netid),
            college: "Engineering".to_string(),
            major: "Computer Science".to_string(),
            class_year: "2026".to_string(),
        };
        let mut user = User::new(netid.to_string(), profile, "hash".to_string());
        if !token.is_empty() {
            user.session_token = format!("{}-session", token);
            user.update_token = format!("{}-update", token);
            user.session_expiration = Utc::now() + Duration::days(180);
        }
        user
    }

    #[test]
    fn test_select_filters() {
        assert!(SELECT_BY_ID.ends_with("FROM users WHERE id = ?"));
        assert!(SELECT_BY_SESSION_TOKEN.ends_with("WHERE session_token = ?"));
        assert!(SELECT_BY_UPDATE_TOKEN.contains("session_expiration, update_token"));
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;

        let created = repo.create(&test_user("abc123", "t1")).await.expect("Failed to create user");
        assert!(created.id > 0);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.netid, "abc123");
        assert_eq!(found.session_token, "t1-session");
        assert_eq!(found.update_token, "t1-update");
        assert_eq!(found.class_year, "2026");
    }

    #[tokio::test]
    async fn test_duplicate_netid_is_unique_violation() {
        let repo = setup_test_repo().await;

        repo.create(&test_user("abc123", "t1")).await.expect("Failed to create user");
        let err = repo.create(&test_user("abc123", "t2")).await.unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_duplicate_session_token_is_unique_violation() {
        let repo = setup_test_repo().await;

        repo.create(&test_user("a1", "same")).await.expect("Failed to create user");
        let err = repo.create(&test_user("b2", "same")).await.unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_lookup_by_tokens_is_exact() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("abc123", "tok")).await.unwrap();

        let by_session = repo.get_by_session_token("tok-session").await.unwrap();
        assert_eq!(by_session.map(|u| u.id), Some(created.id));

        let by_update = repo.get_by_update_token("tok-update").await.unwrap();
        assert_eq!(by_update.map(|u| u.id), Some(created.id));

        assert!(repo.get_by_session_token("TOK-SESSION").await.unwrap().is_none());
        assert!(repo.get_by_session_token("tok").await.unwrap().is_none());
        assert!(repo.get_by_session_token("tok-update").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_token_never_matches() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("a1", "")).await.unwrap();
        repo.create(&test_user("b2", "")).await.unwrap();

        assert!(repo.get_by_session_token("").await.unwrap().is_none());
        assert!(repo.get_by_update_token("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_session_clears_and_sets() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("abc123", "old")).await.unwrap();

        let cleared = SessionTokens {
            session_token: String::new(),
            session_expiration: Utc::now(),
            update_token: String::new(),
        };
        repo.update_session(created.id, &cleared).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(found.session_token.is_empty());
        assert!(found.update_token.is_empty());
        assert!(repo.get_by_session_token("old-session").await.unwrap().is_none());

        let fresh = SessionTokens {
            session_token: "new-session".to_string(),
            session_expiration: Utc::now() + Duration::days(1),
            update_token: "new-update".to_string(),
        };
        repo.update_session(created.id, &fresh).await.unwrap();
        let found = repo.get_by_session_token("new-session").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.update_token, "new-update");
    }

    #[tokio::test]
    async fn test_update_session_unknown_user_fails() {
        let repo = setup_test_repo().await;
        let tokens = SessionTokens {
            session_token: "s".to_string(),
            session_expiration: Utc::now(),
            update_token: "u".to_string(),
        };
        assert!(repo.update_session(999, &tokens).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = setup_test_repo().await;
        let mut user = repo.create(&test_user("abc123", "t")).await.unwrap();

        user.major = "Mathematics".to_string();
        let updated = repo.update_profile(&user).await.unwrap();

        assert_eq!(updated.major, "Mathematics");
        assert_eq!(updated.session_token, "t-session");
    }
}
