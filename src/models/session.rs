//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The matched session/update token pair returned after register, login and renewal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Bearer credential for ordinary requests
    pub session_token: String,
    /// Expiration timestamp of the session token
    pub session_expiration: DateTime<Utc>,
    /// Refresh credential
    pub update_token: String,
}
