//! Key Registry for credential signing
//!
//! Manages the Ed25519 keys behind session credentials:
//! - The active key pair that signs newly issued credentials
//! - Verification keys by key ID, including the active one and any retired
//!   keys whose credentials should stay valid until they expire

use dashmap::DashMap;
use tracing::{info, warn};
use vaultseed_core::{CredentialClaims, KeyPair, PublicKey, SignedCredential, VaultError};

/// Key Registry for credential issuance and verification
#[derive(Debug)]
pub struct KeyRegistry {
    /// Accepted verification keys (kid -> key)
    verification_keys: DashMap<String, PublicKey>,

    /// Key pair used to sign new credentials
    signing_key: KeyPair,
}

impl KeyRegistry {
    /// Create a new key registry with the given signing key pair
    ///
    /// The public half is registered as a verification key.
    pub fn new(signing_key: KeyPair) -> Self {
        let kid = signing_key.kid().to_string();
        let verification_keys = DashMap::new();
        verification_keys.insert(kid.clone(), signing_key.public_key());

        info!(kid = %kid, "Key registry initialized with credential key");

        Self {
            verification_keys,
            signing_key,
        }
    }

    /// Generate a new key registry with a randomly generated signing key
    pub fn generate(kid: impl Into<String>) -> Self {
        Self::new(KeyPair::generate(kid))
    }

    /// Key ID of the active signing key
    pub fn kid(&self) -> &str {
        self.signing_key.kid()
    }

    /// Public half of the active signing key
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.public_key()
    }

    // =========================================================================
    // Verification Keys
    // =========================================================================

    /// Accept credentials signed by `key` (e.g. a previous signing key)
    ///
    /// A key reusing the active kid is ignored.
    pub fn register_verification_key(&self, key: PublicKey) {
        if key.kid() == self.kid() {
            warn!(kid = %key.kid(), "Ignoring verification key that shadows the active key");
            return;
        }
        info!(kid = %key.kid(), "Registered credential verification key");
        self.verification_keys.insert(key.kid().to_string(), key);
    }

    /// Number of accepted verification keys
    pub fn verification_key_count(&self) -> usize {
        self.verification_keys.len()
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Sign claims and encode them as a transport token
    pub fn issue(&self, claims: &CredentialClaims) -> Result<String, VaultError> {
        self.signing_key.sign_credential(claims)?.to_token()
    }

    /// Decode a token and check its signature against the key it names
    ///
    /// Expiry and nonce binding are left to the caller.
    pub fn verify(&self, token: &str) -> Result<CredentialClaims, VaultError> {
        let signed = SignedCredential::from_token(token)?;
        let kid = signed
            .kid()
            .ok_or_else(|| VaultError::MissingField("kid".into()))?;
        let key = self
            .verification_keys
            .get(&kid)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| VaultError::CryptoError(format!("Unknown credential key '{}'", kid)))?;
        key.verify_credential(&signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vaultseed_core::{Address, Nonce};

    fn claims() -> CredentialClaims {
        CredentialClaims::new(
            Address::parse("0x3333333333333333333333333333333333333333").unwrap(),
            Nonce::generate(),
            Duration::minutes(5),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let registry = KeyRegistry::generate("vaultseed-test");
        let claims = claims();
        let token = registry.issue(&claims).unwrap();
        assert_eq!(registry.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_foreign_registry_token_rejected() {
        let ours = KeyRegistry::generate("vaultseed-test");
        let theirs = KeyRegistry::generate("vaultseed-test");
        let token = theirs.issue(&claims()).unwrap();
        assert!(ours.verify(&token).is_err());
    }

    #[test]
    fn test_retired_key_still_verifies() {
        let old = KeyRegistry::generate("old");
        let token = old.issue(&claims()).unwrap();

        let current = KeyRegistry::generate("new");
        assert!(current.verify(&token).is_err());

        current.register_verification_key(old.public_key());
        assert!(current.verify(&token).is_ok());
        assert_eq!(current.verification_key_count(), 2);
    }

    #[test]
    fn test_active_key_cannot_be_shadowed() {
        let registry = KeyRegistry::generate("active");
        let token = registry.issue(&claims()).unwrap();

        registry.register_verification_key(KeyRegistry::generate("active").public_key());
        assert_eq!(registry.verification_key_count(), 1);
        assert!(registry.verify(&token).is_ok());
    }
}
