//! Canonical challenge messages
//!
//! Signer and verifier must build these byte-for-byte identically. Changing
//! either template invalidates every challenge that has been issued but not
//! yet consumed.

use std::fmt;

use crate::address::Address;
use crate::nonce::Nonce;
use crate::signature::normalize_message;

/// Identifier of an encrypted record
pub type RecordId = u64;

/// Service name used in login challenges when none is configured
pub const DEFAULT_SERVICE_NAME: &str = "VaultSeed";

/// A message a client must sign to prove key possession for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// Login (and public-key registration) bound to the identity's nonce
    Authenticate {
        service: String,
        address: Address,
        nonce: Nonce,
    },
    /// Release of one record's ciphertext bound to the record's nonce
    Decrypt { record_id: RecordId, nonce: Nonce },
}

impl Challenge {
    /// Build the login challenge for an identity
    pub fn authenticate(service: impl Into<String>, address: &Address, nonce: &Nonce) -> Self {
        Challenge::Authenticate {
            service: service.into(),
            address: *address,
            nonce: nonce.clone(),
        }
    }

    /// Build the decrypt challenge for a record
    pub fn decrypt(record_id: RecordId, nonce: &Nonce) -> Self {
        Challenge::Decrypt {
            record_id,
            nonce: nonce.clone(),
        }
    }

    /// The nonce this challenge is bound to
    pub fn nonce(&self) -> &Nonce {
        match self {
            Challenge::Authenticate { nonce, .. } | Challenge::Decrypt { nonce, .. } => nonce,
        }
    }

    /// Render the exact text to be signed
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether a client-supplied message is this challenge
    ///
    /// The comparison uses the same normalization the verifier applies before
    /// hashing, so a quoted or padded copy of the challenge still matches.
    pub fn matches(&self, message: &str) -> bool {
        normalize_message(message) == self.message()
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Challenge::Authenticate {
                service,
                address,
                nonce,
            } => write!(
                f,
                "Sign this message to authenticate with {}. Address: {}, Nonce: {}",
                service, address, nonce
            ),
            Challenge::Decrypt { record_id, nonce } => write!(
                f,
                "Sign this message to decrypt content. Content ID: {}, Nonce: {}",
                record_id, nonce
            ),
        }
    }
}
