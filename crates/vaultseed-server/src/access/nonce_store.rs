//! Single-slot nonce registers with per-key serialization
//!
//! Each identity and each record owns one live nonce. Callers take the key's
//! lock for the whole check-then-rotate sequence, and the rotation itself is a
//! compare-and-swap in storage, so a second submission of the same signature
//! always sees the rotated value.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use vaultseed_core::{Address, Nonce, RecordId};

use crate::storage::{StorageError, VaultStore};

/// Which register a nonce lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonceKey {
    /// Login nonce of an identity
    Identity(Address),
    /// Decrypt nonce of a record, as seen by its owner
    Record { id: RecordId, owner: Address },
}

type LockTable = DashMap<NonceKey, Arc<Mutex<()>>>;

/// Exclusive hold on one nonce register
///
/// The lock entry is dropped from the table when the last holder releases it.
pub struct NonceGuard {
    key: NonceKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl std::fmt::Debug for NonceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceGuard").field("key", &self.key).finish()
    }
}

impl Drop for NonceGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Nonce registers backed by a [`VaultStore`]
#[derive(Debug, Clone)]
pub struct NonceStore {
    store: Arc<dyn VaultStore>,
    locks: Arc<LockTable>,
}

impl NonceStore {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Serialize with every other holder of `key`
    pub async fn lock(&self, key: NonceKey) -> NonceGuard {
        let lock = self.locks.entry(key).or_default().clone();
        let guard = lock.lock_owned().await;
        NonceGuard {
            key,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Current nonce of an identity, provisioning the identity if needed
    pub async fn issue_or_get(&self, address: &Address) -> Result<Nonce, StorageError> {
        if let Some(identity) = self.store.get_identity(address).await? {
            return Ok(identity.nonce);
        }
        let identity = self
            .store
            .provision_identity(address, Nonce::generate())
            .await?;
        Ok(identity.nonce)
    }

    /// The live nonce for `key`, if the slot exists
    pub async fn current(&self, key: &NonceKey) -> Result<Option<Nonce>, StorageError> {
        match key {
            NonceKey::Identity(address) => Ok(self
                .store
                .get_identity(address)
                .await?
                .map(|identity| identity.nonce)),
            NonceKey::Record { id, owner } => Ok(self
                .store
                .get_record(*id, owner)
                .await?
                .map(|record| record.nonce)),
        }
    }

    /// Replace the nonce with a fresh one if it is still `expected`
    ///
    /// Returns the new nonce, or `None` when the slot already moved on.
    pub async fn rotate(
        &self,
        key: &NonceKey,
        expected: &Nonce,
    ) -> Result<Option<Nonce>, StorageError> {
        let fresh = Nonce::generate();
        Ok(self.advance(key, expected, &fresh).await?.then_some(fresh))
    }

    /// Move the nonce from `expected` to `next`
    pub async fn advance(
        &self,
        key: &NonceKey,
        expected: &Nonce,
        next: &Nonce,
    ) -> Result<bool, StorageError> {
        let swapped = match key {
            NonceKey::Identity(address) => {
                self.store
                    .swap_identity_nonce(address, expected, next)
                    .await?
            }
            NonceKey::Record { id, .. } => self.store.swap_record_nonce(*id, expected, next).await?,
        };
        log_advance(key, swapped);
        Ok(swapped)
    }

    /// Move an identity nonce from `expected` to `next` while storing its public key
    ///
    /// Neither write lands unless both do.
    pub async fn advance_with_public_key(
        &self,
        address: &Address,
        public_key: String,
        expected: &Nonce,
        next: &Nonce,
    ) -> Result<bool, StorageError> {
        let swapped = self
            .store
            .register_public_key(address, public_key, expected, next)
            .await?;
        log_advance(&NonceKey::Identity(*address), swapped);
        Ok(swapped)
    }

    /// Number of keys currently locked or awaited
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

fn log_advance(key: &NonceKey, swapped: bool) {
    if swapped {
        info!(key = ?key, "Rotated nonce");
    } else {
        debug!(key = ?key, "Nonce rotation lost to a concurrent update");
    }
}
