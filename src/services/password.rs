//! Password hashing module
//!
//! Salted one-way hashing and verification of user passwords using Argon2id.
//!
//! # Security
//!
//! - Uses the Argon2id variant with a tunable memory/time/parallelism cost
//! - Generates a fresh random salt for each password hash
//! - Produces PHC strings, so the salt and cost travel with the hash

use anyhow::Result;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordConfig;

/// Argon2id password hasher with a configured work factor
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher from configuration.
    ///
    /// Fails if the argon2 backend rejects the cost parameters.
    pub fn new(config: &PasswordConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid password hashing parameters: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh salt.
    ///
    /// # Errors
    ///
    /// Only when the random source or the hashing backend fails, which is a
    /// fatal configuration problem.
    ///
    /// ```ignore
    /// let hasher = PasswordHasher::default();
    /// let hash = hasher.hash("pw1")?;
    /// assert!(hash.starts_with("$argon2id$"));
    /// ```
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

        Ok(password_hash.to_string())
    }

    /// Check a password against a stored hash.
    ///
    /// A malformed hash is a mismatch, never an error. The cost parameters
    /// are read from the hash itself, so digests made under an older
    /// configuration still verify.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}
