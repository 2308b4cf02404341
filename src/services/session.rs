//! Session manager
//!
//! Owns the session/update token pair stored on every user:
//! - registration and login
//! - issuing and renewing token pairs
//! - verifying bearer session tokens
//! - logging out
//!
//! Each account moves between three states (see [`SessionState`]):
//! unauthenticated, active and expired. Only this module writes the session
//! fields of a user.
//!
//! Two concurrent renewals of the same account are not ordered; the row
//! update is last-write-wins and the loser's pair is simply gone.

use crate::config::AuthConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::models::{Profile, SessionState, SessionTokens, User};
use crate::services::password::PasswordHasher;
use crate::services::token::{RandomTokenGenerator, TokenSource};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A required field is missing or empty
    #[error("Validation error: {0}")]
    Validation(String),

    /// The netid is already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials, or an unknown, expired or cleared token
    #[error("Unauthorized")]
    Unauthorized,

    /// Persistence or random source failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Input for registering a new account
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub netid: String,
    pub password: String,
    pub profile: Profile,
}

/// Input for logging in
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub netid: String,
    pub password: String,
}

/// Session manager
pub struct SessionManager {
    user_repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<dyn TokenSource>,
    /// `None` when the configured day count does not fit a `Duration`
    session_window: Option<Duration>,
    token_retries: u32,
}

impl SessionManager {
    /// Create a session manager drawing tokens from the OS random source
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        config: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            tokens: Arc::new(RandomTokenGenerator),
            session_window: Duration::try_days(config.session_days),
            token_retries: config.token_retries,
        }
    }

    /// Replace the token source
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Register a new account and mint its first token pair.
    ///
    /// # Errors
    ///
    /// - `Validation` if the netid, password or any profile field is empty
    /// - `Conflict` if the netid is taken
    /// - `Internal` for database or random source errors
    ///
    /// The account row is written before its first pair is issued. If issuing
    /// then fails the account remains without a session; registering again is
    /// a `Conflict`, and `login` mints the missing pair.
    pub async fn register(&self, input: RegisterInput) -> Result<User, SessionError> {
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_netid(&input.netid)
            .await
            .context("Failed to check netid")?
            .is_some()
        {
            return Err(netid_taken(&input.netid));
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let user = User::new(input.netid, input.profile, password_hash);

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            // Lost a race with a concurrent registration of the same netid
            Err(e) if is_unique_violation(&e) => return Err(netid_taken(&user.netid)),
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = created.id, "Registered user");
        self.issue(&created).await
    }

    /// Log in with netid and password.
    ///
    /// An account with an active session gets its existing pair back; the
    /// pair is not rotated, so a leaked pair outlives a later login. An
    /// account without one (logged out or expired) gets a fresh pair.
    ///
    /// Unknown netids and wrong passwords are both `Unauthorized`.
    pub async fn login(&self, input: LoginInput) -> Result<User, SessionError> {
        let Some(user) = self
            .user_repo
            .get_by_netid(&input.netid)
            .await
            .context("Failed to look up user")?
        else {
            tracing::warn!("Login rejected: unknown netid");
            return Err(SessionError::Unauthorized);
        };

        if !self.hasher.verify(&input.password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(SessionError::Unauthorized);
        }

        match user.session_state(Utc::now()) {
            SessionState::Active => Ok(user),
            SessionState::Unauthenticated | SessionState::Expired => self.issue(&user).await,
        }
    }

    /// Mint and persist a fresh token pair valid for the session window.
    ///
    /// Regenerates both tokens when storage reports a uniqueness collision,
    /// up to the configured retry budget.
    pub async fn issue(&self, user: &User) -> Result<User, SessionError> {
        for attempt in 0..=self.token_retries {
            let tokens = SessionTokens {
                session_token: self.tokens.generate()?,
                session_expiration: self.session_expiration()?,
                update_token: self.tokens.generate()?,
            };

            if tokens.session_token == tokens.update_token {
                tracing::warn!(user_id = user.id, attempt, "Generated identical token pair, regenerating");
                continue;
            }

            match self.user_repo.update_session(user.id, &tokens).await {
                Ok(()) => {
                    tracing::debug!(user_id = user.id, "Issued session tokens");
                    return Ok(User {
                        session_token: tokens.session_token,
                        session_expiration: tokens.session_expiration,
                        update_token: tokens.update_token,
                        ..user.clone()
                    });
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(user_id = user.id, attempt, "Session token collision, regenerating");
                }
                Err(e) => return Err(e.context("Failed to store session tokens").into()),
            }
        }

        Err(SessionError::Internal(anyhow::anyhow!(
            "Could not issue unique session tokens after {} attempts",
            self.token_retries + 1
        )))
    }

    /// Expiration for a pair issued now
    fn session_expiration(&self) -> Result<DateTime<Utc>, SessionError> {
        self.session_window
            .and_then(|window| Utc::now().checked_add_signed(window))
            .ok_or_else(|| {
                SessionError::Internal(anyhow::anyhow!("Session window overflows the clock"))
            })
    }

    /// Trade an update token for a new pair. Both tokens rotate.
    pub async fn renew(&self, update_token: &str) -> Result<User, SessionError> {
        let user = self
            .user_repo
            .get_by_update_token(update_token)
            .await
            .context("Failed to look up update token")?
            .filter(|user| user.verify_update_token(update_token))
            .ok_or(SessionError::Unauthorized)?;

        self.issue(&user).await
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for the empty token, unknown tokens and expired ones.
    pub async fn verify(&self, session_token: &str) -> Result<Option<User>, SessionError> {
        if session_token.is_empty() {
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_session_token(session_token)
            .await
            .context("Failed to look up session token")?;

        Ok(user.filter(|user| user.verify_session_token(session_token, Utc::now())))
    }

    /// Clear both tokens and expire the session immediately
    pub async fn logout(&self, user: &User) -> Result<User, SessionError> {
        let cleared = SessionTokens {
            session_token: String::new(),
            session_expiration: Utc::now(),
            update_token: String::new(),
        };

        self.user_repo
            .update_session(user.id, &cleared)
            .await
            .context("Failed to clear session")?;

        tracing::info!(user_id = user.id, "Logged out");
        Ok(User {
            session_token: cleared.session_token,
            session_expiration: cleared.session_expiration,
            update_token: cleared.update_token,
            ..user.clone()
        })
    }
}

fn netid_taken(netid: &str) -> SessionError {
    SessionError::Conflict(format!("User with netid '{}' already exists", netid))
}

fn validate_register_input(input: &RegisterInput) -> Result<(), SessionError> {
    if input.netid.trim().is_empty() {
        return Err(SessionError::Validation("netid cannot be empty".to_string()));
    }
    if input.password.is_empty() {
        return Err(SessionError::Validation("password cannot be empty".to_string()));
    }
    if let Some(field) = input.profile.first_missing_field() {
        return Err(SessionError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}
