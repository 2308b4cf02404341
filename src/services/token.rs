//! Session token generation
//!
//! Tokens are opaque, fixed-length lowercase hex strings: 64 bytes from the
//! operating system's random source, digested with SHA-256.

use anyhow::Result;
use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

/// Bytes of entropy behind every token
pub const TOKEN_ENTROPY_BYTES: usize = 64;

/// Length of a rendered token in characters
pub const TOKEN_LENGTH: usize = 64;

/// Source of fresh opaque tokens.
///
/// The session manager takes this as a trait object so tests can script
/// collisions.
pub trait TokenSource: Send + Sync {
    /// Produce a new token.
    ///
    /// Fails only when the random source is unavailable.
    fn generate(&self) -> Result<String>;
}

/// Token source backed by the operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenGenerator;

impl TokenSource for RandomTokenGenerator {
    fn generate(&self) -> Result<String> {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        getrandom::fill(&mut bytes)
            .map_err(|e| anyhow::anyhow!("Random source unavailable: {}", e))?;

        Ok(HEXLOWER.encode(&Sha256::digest(bytes)))
    }
}
