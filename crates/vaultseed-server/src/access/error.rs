//! Authorization errors
//!
//! Callers see four classes. Every reason a signed request can be refused
//! collapses into `Unauthorized`, and a foreign record looks exactly like a
//! missing one, so responses cannot reveal which check failed.

use thiserror::Error;
use vaultseed_core::VaultError;

use crate::storage::StorageError;

/// What the caller is allowed to learn about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    Unauthorized,
    Internal,
}

/// Failure of an authentication or authorization operation
#[derive(Error, Debug)]
pub enum AccessError {
    /// Input could not be parsed; nothing was touched
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unknown identity")]
    UnknownIdentity,

    /// Absent, or owned by someone else
    #[error("Unknown record")]
    UnknownRecord,

    #[error("Signature does not match the claimed identity or challenge")]
    SignatureInvalid,

    #[error("Nonce is stale or does not match")]
    NonceMismatch,

    /// Login for an identity that had no outstanding challenge
    #[error("No challenge was issued for this identity")]
    ChallengeNotIssued,

    #[error("Credential rejected: {0}")]
    CredentialRejected(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Credential issuance failed: {0}")]
    Issuance(VaultError),
}

impl AccessError {
    /// Caller-visible class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            AccessError::MalformedInput(_) => ErrorClass::BadRequest,
            AccessError::UnknownIdentity | AccessError::UnknownRecord => ErrorClass::NotFound,
            AccessError::SignatureInvalid
            | AccessError::NonceMismatch
            | AccessError::ChallengeNotIssued
            | AccessError::CredentialRejected(_) => ErrorClass::Unauthorized,
            AccessError::Storage(_) | AccessError::Issuance(_) => ErrorClass::Internal,
        }
    }
}

/// Map a parse failure of client input
///
/// A parity byte outside every known convention is a signature that cannot
/// verify, not a formatting mistake, so it is refused as unauthorized.
impl From<VaultError> for AccessError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::UnrecognizedParity(_) | VaultError::RecoveryFailed(_) => {
                AccessError::SignatureInvalid
            }
            VaultError::CredentialExpired(_) => AccessError::CredentialRejected(err.to_string()),
            other => AccessError::MalformedInput(other.to_string()),
        }
    }
}
