//! Replay-protection nonces
//!
//! A nonce is 32 bytes from the operating system CSPRNG rendered as 64
//! lowercase hex characters. Exactly one nonce is live per identity or record;
//! it is embedded in the next challenge and replaced once consumed.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Number of random bytes in a generated nonce
pub const NONCE_BYTES: usize = 32;

/// A single-use, unguessable challenge token
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh nonce from the OS random source
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept a nonce presented by a client or read back from storage
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(VaultError::InvalidNonce("nonce cannot be empty".into()));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(VaultError::InvalidNonce(
                "nonce contains whitespace or control characters".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Borrow the nonce text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.0)
    }
}

impl AsRef<str> for Nonce {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
