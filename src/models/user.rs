//! User model
//!
//! This module defines the User entity together with the session fields that
//! only the session manager mutates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionTokens;

/// User entity representing a registered account.
///
/// The session fields hold the single token pair of the account. An empty
/// `session_token` means there is no session at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Institutional identifier used to log in (unique)
    pub netid: String,
    /// Display name
    pub name: String,
    pub college: String,
    pub major: String,
    pub class_year: String,
    /// Password hash (argon2, PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Bearer credential for ordinary requests
    #[serde(skip_serializing)]
    pub session_token: String,
    /// Instant at which `session_token` stops being accepted
    #[serde(skip_serializing)]
    pub session_expiration: DateTime<Utc>,
    /// Refresh credential, only good for minting a new pair
    #[serde(skip_serializing)]
    pub update_token: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User without any session.
    ///
    /// Note: The password should already be hashed before calling this function.
    pub fn new(netid: String, profile: Profile, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            netid,
            name: profile.name,
            college: profile.college,
            major: profile.major,
            class_year: profile.class_year,
            password_hash,
            session_token: String::new(),
            session_expiration: now,
            update_token: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Where the account stands in the session lifecycle at `now`
    pub fn session_state(&self, now: DateTime<Utc>) -> SessionState {
        if self.session_token.is_empty() {
            SessionState::Unauthenticated
        } else if now < self.session_expiration {
            SessionState::Active
        } else {
            SessionState::Expired
        }
    }

    /// Exact-match check of a presented session token, honouring expiry
    pub fn verify_session_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        !token.is_empty()
            && self.session_token == token
            && self.session_state(now) == SessionState::Active
    }

    /// Exact-match check of a presented update token
    pub fn verify_update_token(&self, token: &str) -> bool {
        !token.is_empty() && self.update_token == token
    }

    /// The current token pair as handed to clients
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens {
            session_token: self.session_token.clone(),
            session_expiration: self.session_expiration,
            update_token: self.update_token.clone(),
        }
    }
}

/// Session lifecycle of a single account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token pair (never issued, or logged out)
    Unauthenticated,
    /// Token pair present and not yet expired
    Active,
    /// Token pair present but past its expiration
    Expired,
}

/// Required profile fields of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub college: String,
    pub major: String,
    pub class_year: String,
}

impl Profile {
    /// Name of the first field that is empty after trimming, if any
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("college", &self.college),
            ("major", &self.major),
            ("class_year", &self.class_year),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// Partial profile edit; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub college: Option<String>,
    pub major: Option<String>,
    pub class_year: Option<String>,
}

/// Public projection of a user, as embedded in course listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub college: String,
    pub major: String,
    pub class_year: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            college: user.college.clone(),
            major: user.major.clone(),
            class_year: user.class_year.clone(),
        }
    }
}
