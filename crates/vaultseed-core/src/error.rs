//! Error types for the VaultSeed primitives

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while parsing, verifying or signing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Address is not 20 bytes of hex
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Signature is not a 65-byte hex string
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Recovery byte is outside every known convention
    #[error("Unrecognized signature parity byte: {0}")]
    UnrecognizedParity(u8),

    /// Public key could not be recovered from the signature
    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),

    /// Nonce is empty or not printable
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    /// Credential is past its expiry
    #[error("Credential expired at {0}")]
    CredentialExpired(String),

    /// Credential lifetime runs past the representable time range
    #[error("Invalid credential lifetime: {0}")]
    InvalidLifetime(String),

    /// Cryptographic error
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// COSE encoding/decoding error
    #[error("COSE error: {0}")]
    CoseError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<ed25519_dalek::SignatureError> for VaultError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        VaultError::CryptoError(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::SerializationError(err.to_string())
    }
}

impl From<coset::CoseError> for VaultError {
    fn from(err: coset::CoseError) -> Self {
        VaultError::CoseError(format!("{:?}", err))
    }
}

impl From<base64::DecodeError> for VaultError {
    fn from(err: base64::DecodeError) -> Self {
        VaultError::SerializationError(format!("Invalid base64 encoding: {}", err))
    }
}
