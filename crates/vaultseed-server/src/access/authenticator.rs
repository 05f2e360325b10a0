//! Login and public-key registration
//!
//! Per identity the flow is:
//!
//! ```text
//! Unprovisioned --(nonce request or login attempt)--> Provisioned { n0 }
//! Provisioned { n0 } --(signed challenge over n0)--> Provisioned { n1 } + credential
//! ```
//!
//! A login for an address that has never been issued a nonce provisions the
//! identity but is refused, so the caller must sign a challenge it was given.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use vaultseed_core::{
    Address, Challenge, CredentialClaims, Nonce, RecoverableSignature, SignatureVerifier,
};

use super::error::AccessError;
use super::nonce_store::{NonceKey, NonceStore};
use crate::keys::KeyRegistry;
use crate::storage::VaultStore;

/// Longest accepted public key blob
pub const MAX_PUBLIC_KEY_LEN: usize = 1024;

/// A credential handed to a client after a verified signature
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Transport token
    pub token: String,
    pub address: Address,
    pub expires_at: DateTime<Utc>,
}

/// Orchestrates nonce issuance, login and key registration
#[derive(Debug, Clone)]
pub struct Authenticator {
    store: Arc<dyn VaultStore>,
    nonces: NonceStore,
    keys: Arc<KeyRegistry>,
    service_name: String,
    credential_ttl: chrono::Duration,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn VaultStore>,
        nonces: NonceStore,
        keys: Arc<KeyRegistry>,
        service_name: impl Into<String>,
        credential_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            nonces,
            keys,
            service_name: service_name.into(),
            credential_ttl,
        }
    }

    /// The login challenge for `address` under `nonce`
    pub fn challenge(&self, address: &Address, nonce: &Nonce) -> Challenge {
        Challenge::authenticate(&self.service_name, address, nonce)
    }

    /// Current login nonce for `address`, provisioning the identity if needed
    pub async fn get_or_issue_nonce(&self, address: &str) -> Result<Nonce, AccessError> {
        let address = parse_address(address)?;
        Ok(self.nonces.issue_or_get(&address).await?)
    }

    /// Exchange a signed login challenge for a credential
    pub async fn login(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<IssuedCredential, AccessError> {
        let address = parse_address(address)?;
        let signature = RecoverableSignature::from_hex(signature)?;

        let key = NonceKey::Identity(address);
        let _guard = self.nonces.lock(key).await;

        let Some(identity) = self.store.get_identity(&address).await? else {
            self.store
                .provision_identity(&address, Nonce::generate())
                .await?;
            warn!(address = %address, "SECURITY: login before any challenge was issued");
            return Err(AccessError::ChallengeNotIssued);
        };

        self.verify_challenge(&address, &identity.nonce, message, &signature)?;
        let next = Nonce::generate();
        let credential = self.issue_credential(address, next.clone())?;
        if !self.nonces.advance(&key, &identity.nonce, &next).await? {
            return Err(AccessError::NonceMismatch);
        }

        info!(address = %address, "Login succeeded");
        Ok(credential)
    }

    /// Attach a public key blob to an identity
    ///
    /// The signature must cover the login challenge for the current nonce.
    /// The key is stored and that nonce consumed in one write, so the same
    /// signature cannot then be used to log in, and a credential bound to the
    /// new nonce is returned.
    pub async fn register_public_key(
        &self,
        address: &str,
        public_key: &str,
        message: &str,
        signature: &str,
    ) -> Result<IssuedCredential, AccessError> {
        let address = parse_address(address)?;
        let public_key = public_key.trim();
        if public_key.is_empty() || public_key.len() > MAX_PUBLIC_KEY_LEN {
            return Err(AccessError::MalformedInput(format!(
                "public key must be 1 to {} characters",
                MAX_PUBLIC_KEY_LEN
            )));
        }
        let signature = RecoverableSignature::from_hex(signature)?;

        let key = NonceKey::Identity(address);
        let _guard = self.nonces.lock(key).await;

        let identity = self
            .store
            .get_identity(&address)
            .await?
            .ok_or(AccessError::UnknownIdentity)?;

        self.verify_challenge(&address, &identity.nonce, message, &signature)?;
        let next = Nonce::generate();
        let credential = self.issue_credential(address, next.clone())?;
        if !self
            .nonces
            .advance_with_public_key(&address, public_key.to_string(), &identity.nonce, &next)
            .await?
        {
            return Err(AccessError::NonceMismatch);
        }

        info!(address = %address, "Registered public key");
        Ok(credential)
    }

    /// Resolve a presented credential to the identity it was issued to
    ///
    /// Fails once the identity's nonce has moved past the one the credential
    /// was bound to.
    pub async fn authenticate_credential(&self, token: &str) -> Result<Address, AccessError> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "SECURITY: credential failed verification");
            AccessError::CredentialRejected(e.to_string())
        })?;
        claims
            .validate_temporal()
            .map_err(|e| AccessError::CredentialRejected(e.to_string()))?;

        let current = self
            .nonces
            .current(&NonceKey::Identity(claims.address))
            .await?;
        match current {
            Some(nonce) if claims.is_bound_to(&claims.address, &nonce) => Ok(claims.address),
            _ => {
                warn!(address = %claims.address, "SECURITY: stale credential presented");
                Err(AccessError::CredentialRejected("stale credential".into()))
            }
        }
    }

    fn verify_challenge(
        &self,
        address: &Address,
        current: &Nonce,
        message: &str,
        signature: &RecoverableSignature,
    ) -> Result<(), AccessError> {
        if !SignatureVerifier::verify_parsed(message, signature, address) {
            warn!(address = %address, "SECURITY: login signature rejected");
            return Err(AccessError::SignatureInvalid);
        }
        if !self.challenge(address, current).matches(message) {
            warn!(address = %address, "SECURITY: signed message is not the current challenge");
            return Err(AccessError::NonceMismatch);
        }
        Ok(())
    }

    fn issue_credential(
        &self,
        address: Address,
        nonce: Nonce,
    ) -> Result<IssuedCredential, AccessError> {
        let claims = CredentialClaims::new(address, nonce, self.credential_ttl)
            .map_err(AccessError::Issuance)?;
        let expires_at = claims.expires_at().map_err(AccessError::Issuance)?;
        let token = self.keys.issue(&claims).map_err(AccessError::Issuance)?;
        Ok(IssuedCredential {
            token,
            address,
            expires_at,
        })
    }
}

pub(crate) fn parse_address(address: &str) -> Result<Address, AccessError> {
    Address::parse(address).map_err(|e| AccessError::MalformedInput(e.to_string()))
}
