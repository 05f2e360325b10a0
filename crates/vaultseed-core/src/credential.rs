//! Session credentials
//!
//! A credential is issued after a verified login and presented on later
//! requests instead of re-signing. Its claims bind it to an address and to
//! the identity nonce that was current at issue time. The server signs the
//! claims (see [`crate::crypto`]); a credential is honoured only while its
//! signature verifies, it has not expired, and the bound nonce is still the
//! identity's current nonce.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Result, VaultError};
use crate::nonce::Nonce;

/// Claims carried inside a signed credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Identity the credential was issued to
    pub address: Address,

    /// Identity nonce current at issue time
    pub nonce: Nonce,

    /// Issued at (RFC 3339)
    pub iat: String,

    /// Expiration (RFC 3339)
    pub exp: String,
}

impl CredentialClaims {
    /// Claims issued now and valid for `ttl`
    pub fn new(address: Address, nonce: Nonce, ttl: Duration) -> Result<Self> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| VaultError::InvalidLifetime(format!("{}s", ttl.num_seconds())))?;
        Ok(Self {
            address,
            nonce,
            iat: now.to_rfc3339(),
            exp: exp.to_rfc3339(),
        })
    }

    /// Parsed expiry
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.exp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| VaultError::SerializationError(format!("Invalid exp timestamp: {}", e)))
    }

    /// Fail if the credential is past its expiry
    pub fn validate_temporal(&self) -> Result<()> {
        if Utc::now() > self.expires_at()? {
            return Err(VaultError::CredentialExpired(self.exp.clone()));
        }
        Ok(())
    }

    /// Whether the credential is still bound to `current`
    pub fn is_bound_to(&self, address: &Address, current: &Nonce) -> bool {
        self.address == *address && self.nonce == *current
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(VaultError::from)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(VaultError::from)
    }
}
