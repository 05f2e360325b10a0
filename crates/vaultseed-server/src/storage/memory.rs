//! In-memory storage backend
//!
//! Default storage implementation using in-memory hashmaps.
//! Suitable for development and single-instance deployments.
//! Data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use vaultseed_core::{Address, Nonce, RecordId};

use super::{EncryptedRecord, Identity, NewRecord, RecordSummary, StorageError, VaultStore};

#[derive(Debug, Default)]
struct Records {
    next_id: RecordId,
    rows: HashMap<RecordId, EncryptedRecord>,
}

/// In-memory vault store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: RwLock<HashMap<Address, Identity>>,
    records: RwLock<Records>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    // =========================================================================
    // Identities
    // =========================================================================

    async fn get_identity(&self, address: &Address) -> Result<Option<Identity>, StorageError> {
        let identities = self.identities.read().await;
        Ok(identities.get(address).cloned())
    }

    async fn provision_identity(
        &self,
        address: &Address,
        nonce: Nonce,
    ) -> Result<Identity, StorageError> {
        let mut identities = self.identities.write().await;
        let identity = identities.entry(*address).or_insert_with(|| {
            info!(address = %address, "Provisioning identity");
            let now = Utc::now();
            Identity {
                address: *address,
                public_key: None,
                nonce,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(identity.clone())
    }

    async fn register_public_key(
        &self,
        address: &Address,
        public_key: String,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError> {
        let mut identities = self.identities.write().await;
        match identities.get_mut(address) {
            Some(identity) if identity.nonce == *expected => {
                identity.public_key = Some(public_key);
                identity.nonce = new.clone();
                identity.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn swap_identity_nonce(
        &self,
        address: &Address,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError> {
        let mut identities = self.identities.write().await;
        match identities.get_mut(address) {
            Some(identity) if identity.nonce == *expected => {
                identity.nonce = new.clone();
                identity.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn identity_count(&self) -> Result<usize, StorageError> {
        Ok(self.identities.read().await.len())
    }

    // =========================================================================
    // Encrypted Records
    // =========================================================================

    async fn create_record(
        &self,
        record: NewRecord,
        nonce: Nonce,
    ) -> Result<EncryptedRecord, StorageError> {
        let mut records = self.records.write().await;
        records.next_id += 1;
        let id = records.next_id;
        let now = Utc::now();

        let stored = EncryptedRecord {
            id,
            owner: record.owner,
            title: record.title,
            ciphertext: record.ciphertext,
            wrapped_key: record.wrapped_key,
            iv: record.iv,
            nonce,
            created_at: now,
            updated_at: now,
        };
        info!(record_id = id, owner = %stored.owner, "Stored encrypted record");
        records.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_record(
        &self,
        id: RecordId,
        owner: &Address,
    ) -> Result<Option<EncryptedRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .rows
            .get(&id)
            .filter(|r| r.owner == *owner)
            .cloned())
    }

    async fn list_records(&self, owner: &Address) -> Result<Vec<RecordSummary>, StorageError> {
        let records = self.records.read().await;
        let mut owned: Vec<&EncryptedRecord> =
            records.rows.values().filter(|r| r.owner == *owner).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned.into_iter().map(RecordSummary::from).collect())
    }

    async fn swap_record_nonce(
        &self,
        id: RecordId,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        match records.rows.get_mut(&id) {
            Some(record) if record.nonce == *expected => {
                record.nonce = new.clone();
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_count(&self) -> Result<usize, StorageError> {
        Ok(self.records.read().await.rows.len())
    }
}
