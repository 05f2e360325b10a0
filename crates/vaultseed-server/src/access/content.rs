//! Encrypted record access
//!
//! The controller stores and lists ciphertext and decides when to release it.
//! It never decrypts: release of the envelope to the record's owner is the
//! whole of its authority.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use vaultseed_core::{Address, Challenge, Nonce, RecordId, RecoverableSignature, SignatureVerifier};

use super::error::AccessError;
use super::nonce_store::{NonceKey, NonceStore};
use crate::storage::{EncryptedRecord, NewRecord, RecordSummary, VaultStore};

/// Longest accepted record title, in characters
pub const MAX_TITLE_LEN: usize = 100;

/// Record metadata plus the nonce to sign for the next decrypt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDetail {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub nonce: Nonce,
}

/// Ciphertext released by a successful decrypt authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextEnvelope {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub ciphertext: String,
    pub wrapped_key: String,
    pub iv: String,
}

impl From<EncryptedRecord> for CiphertextEnvelope {
    fn from(record: EncryptedRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            ciphertext: record.ciphertext,
            wrapped_key: record.wrapped_key,
            iv: record.iv,
        }
    }
}

/// Gate between owners and their stored ciphertext
#[derive(Debug, Clone)]
pub struct ContentAccessController {
    store: Arc<dyn VaultStore>,
    nonces: NonceStore,
}

impl ContentAccessController {
    pub fn new(store: Arc<dyn VaultStore>, nonces: NonceStore) -> Self {
        Self { store, nonces }
    }

    /// Store a new record with a fresh decrypt nonce
    ///
    /// The title is stored trimmed.
    pub async fn create_record(&self, record: NewRecord) -> Result<RecordId, AccessError> {
        let record = validate_new_record(record)?;
        let stored = self.store.create_record(record, Nonce::generate()).await?;
        Ok(stored.id)
    }

    /// The owner's records, newest first
    pub async fn list_records(&self, owner: &Address) -> Result<Vec<RecordSummary>, AccessError> {
        Ok(self.store.list_records(owner).await?)
    }

    /// Nonce to embed in the next decrypt challenge for a record
    pub async fn get_record_nonce(
        &self,
        record_id: RecordId,
        address: &Address,
    ) -> Result<Nonce, AccessError> {
        self.nonces
            .current(&NonceKey::Record {
                id: record_id,
                owner: *address,
            })
            .await?
            .ok_or(AccessError::UnknownRecord)
    }

    /// Record metadata and current nonce, for its owner only
    pub async fn record_detail(
        &self,
        record_id: RecordId,
        address: &Address,
    ) -> Result<RecordDetail, AccessError> {
        let record = self
            .store
            .get_record(record_id, address)
            .await?
            .ok_or(AccessError::UnknownRecord)?;
        Ok(RecordDetail {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            nonce: record.nonce,
        })
    }

    /// Release a record's ciphertext against a signed decrypt challenge
    ///
    /// The record's nonce is rotated before the envelope is returned, so the
    /// same signature is refused on every later attempt.
    pub async fn authorize_decrypt(
        &self,
        record_id: RecordId,
        address: &Address,
        message: &str,
        nonce: &str,
        signature: &str,
    ) -> Result<CiphertextEnvelope, AccessError> {
        let presented = Nonce::parse(nonce)?;
        let signature = RecoverableSignature::from_hex(signature)?;

        let key = NonceKey::Record {
            id: record_id,
            owner: *address,
        };
        let _guard = self.nonces.lock(key).await;

        let record = self
            .store
            .get_record(record_id, address)
            .await?
            .ok_or(AccessError::UnknownRecord)?;

        if !SignatureVerifier::verify_parsed(message, &signature, address)
            || !Challenge::decrypt(record_id, &presented).matches(message)
        {
            warn!(record_id, address = %address, "SECURITY: decrypt signature rejected");
            return Err(AccessError::SignatureInvalid);
        }

        if presented != record.nonce {
            warn!(record_id, address = %address, "SECURITY: decrypt with stale nonce");
            return Err(AccessError::NonceMismatch);
        }

        self.nonces
            .rotate(&key, &record.nonce)
            .await?
            .ok_or(AccessError::NonceMismatch)?;

        info!(record_id, address = %address, "Released ciphertext");
        Ok(record.into())
    }
}

fn validate_new_record(mut record: NewRecord) -> Result<NewRecord, AccessError> {
    let title = record.title.trim();
    if title.is_empty() {
        return Err(AccessError::MalformedInput("title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AccessError::MalformedInput(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    record.title = title.to_string();

    for (field, value) in [
        ("encrypted_data", &record.ciphertext),
        ("encrypted_key", &record.wrapped_key),
        ("iv", &record.iv),
    ] {
        if value.is_empty() {
            return Err(AccessError::MalformedInput(format!("{} is required", field)));
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ErrorClass;
    use crate::storage::MemoryStore;
    use vaultseed_core::{ParityEncoding, Wallet};

    fn controller() -> ContentAccessController {
        let store: Arc<dyn VaultStore> = Arc::new(MemoryStore::new());
        ContentAccessController::new(Arc::clone(&store), NonceStore::new(store))
    }

    fn draft(owner: Address, title: &str) -> NewRecord {
        NewRecord {
            owner,
            title: title.to_string(),
            ciphertext: "Y2lwaGVydGV4dA==".to_string(),
            wrapped_key: "d3JhcHBlZA==".to_string(),
            iv: "aXY=".to_string(),
        }
    }

    fn sign_decrypt(wallet: &Wallet, id: RecordId, nonce: &Nonce) -> (String, String) {
        let message = Challenge::decrypt(id, nonce).message();
        let signature = wallet
            .sign_message(&message)
            .unwrap()
            .to_hex(ParityEncoding::Legacy);
        (message, signature)
    }

    #[tokio::test]
    async fn test_decrypt_releases_and_rotates() {
        let content = controller();
        let wallet = Wallet::generate();
        let owner = wallet.address();
        let id = content.create_record(draft(owner, "diary")).await.unwrap();

        let r0 = content.get_record_nonce(id, &owner).await.unwrap();
        let (message, signature) = sign_decrypt(&wallet, id, &r0);

        let envelope = content
            .authorize_decrypt(id, &owner, &message, r0.as_str(), &signature)
            .await
            .unwrap();
        assert_eq!(envelope.id, id);
        assert_eq!(envelope.ciphertext, "Y2lwaGVydGV4dA==");

        let r1 = content.get_record_nonce(id, &owner).await.unwrap();
        assert_ne!(r0, r1);

        let err = content
            .authorize_decrypt(id, &owner, &message, r0.as_str(), &signature)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Unauthorized);
    }

    #[tokio::test]
    async fn test_foreign_record_looks_missing() {
        let content = controller();
        let alice = Wallet::generate();
        let bob = Wallet::generate();
        let id = content
            .create_record(draft(alice.address(), "alice only"))
            .await
            .unwrap();
        let r0 = content.get_record_nonce(id, &alice.address()).await.unwrap();
        let (message, signature) = sign_decrypt(&bob, id, &r0);

        let foreign = content
            .authorize_decrypt(id, &bob.address(), &message, r0.as_str(), &signature)
            .await
            .unwrap_err();
        let missing = content
            .authorize_decrypt(id + 100, &bob.address(), &message, r0.as_str(), &signature)
            .await
            .unwrap_err();

        assert!(matches!(foreign, AccessError::UnknownRecord));
        assert!(matches!(missing, AccessError::UnknownRecord));
        assert!(matches!(
            content.get_record_nonce(id, &bob.address()).await,
            Err(AccessError::UnknownRecord)
        ));
        assert!(matches!(
            content.record_detail(id, &bob.address()).await,
            Err(AccessError::UnknownRecord)
        ));
    }

    #[tokio::test]
    async fn test_signed_but_stale_nonce_is_mismatch() {
        let content = controller();
        let wallet = Wallet::generate();
        let owner = wallet.address();
        let id = content.create_record(draft(owner, "notes")).await.unwrap();

        let guessed = Nonce::generate();
        let (message, signature) = sign_decrypt(&wallet, id, &guessed);
        let err = content
            .authorize_decrypt(id, &owner, &message, guessed.as_str(), &signature)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NonceMismatch));
        assert_eq!(err.class(), ErrorClass::Unauthorized);
    }

    #[tokio::test]
    async fn test_message_for_other_record_rejected() {
        let content = controller();
        let wallet = Wallet::generate();
        let owner = wallet.address();
        let first = content.create_record(draft(owner, "a")).await.unwrap();
        let second = content.create_record(draft(owner, "b")).await.unwrap();

        let r0 = content.get_record_nonce(first, &owner).await.unwrap();
        let (message, signature) = sign_decrypt(&wallet, first, &r0);
        let err = content
            .authorize_decrypt(second, &owner, &message, r0.as_str(), &signature)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::SignatureInvalid));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let content = controller();
        let owner = Wallet::generate().address();

        let err = content.create_record(draft(owner, "  ")).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::BadRequest);

        let long = "t".repeat(MAX_TITLE_LEN + 1);
        assert!(content.create_record(draft(owner, &long)).await.is_err());

        let exact = "t".repeat(MAX_TITLE_LEN);
        assert!(content.create_record(draft(owner, &exact)).await.is_ok());

        let mut missing_iv = draft(owner, "x");
        missing_iv.iv.clear();
        assert!(content.create_record(missing_iv).await.is_err());
    }

    #[tokio::test]
    async fn test_title_stored_trimmed() {
        let content = controller();
        let owner = Wallet::generate().address();

        let padded = format!("  {}  ", "t".repeat(MAX_TITLE_LEN));
        let id = content.create_record(draft(owner, &padded)).await.unwrap();
        let detail = content.record_detail(id, &owner).await.unwrap();
        assert_eq!(detail.title, "t".repeat(MAX_TITLE_LEN));

        let listed = content.list_records(&owner).await.unwrap();
        assert_eq!(listed[0].title, "t".repeat(MAX_TITLE_LEN));
    }

    #[tokio::test]
    async fn test_detail_and_listing() {
        let content = controller();
        let owner = Wallet::generate().address();
        let id = content.create_record(draft(owner, "ledger")).await.unwrap();

        let detail = content.record_detail(id, &owner).await.unwrap();
        assert_eq!(detail.title, "ledger");
        assert_eq!(detail.nonce, content.get_record_nonce(id, &owner).await.unwrap());

        let listed = content.list_records(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }
}
