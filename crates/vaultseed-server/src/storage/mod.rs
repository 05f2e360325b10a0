//! Storage abstraction for VaultSeed
//!
//! This module provides a trait-based abstraction over identity and record
//! storage, with an in-memory default and a persistent (PostgreSQL) backend.
//!
//! Nonce updates go through compare-and-swap methods so the check-then-rotate
//! step stays race-free even when several server instances share a database.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use vaultseed_core::{Address, Nonce, RecordId};

/// Error type for storage operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// An authenticating identity, keyed by address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Canonical address
    pub address: Address,
    /// Optional client-supplied public key blob
    pub public_key: Option<String>,
    /// Current login nonce
    pub nonce: Nonce,
    /// When the identity was first provisioned
    pub created_at: DateTime<Utc>,
    /// Last nonce rotation or key registration
    pub updated_at: DateTime<Utc>,
}

/// A stored ciphertext record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub id: RecordId,
    pub owner: Address,
    pub title: String,
    /// Opaque client-encrypted payload
    pub ciphertext: String,
    /// Content key wrapped for the owner
    pub wrapped_key: String,
    pub iv: String,
    /// Current decrypt nonce, independent of the owner's login nonce
    pub nonce: Nonce,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a record is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub owner: Address,
    pub title: String,
    pub ciphertext: String,
    pub wrapped_key: String,
    pub iv: String,
}

/// Listing projection of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&EncryptedRecord> for RecordSummary {
    fn from(record: &EncryptedRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            created_at: record.created_at,
        }
    }
}

/// Storage backend trait for VaultSeed state
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait VaultStore: Send + Sync + Debug {
    // =========================================================================
    // Identities
    // =========================================================================

    /// Get an identity by address
    async fn get_identity(&self, address: &Address) -> Result<Option<Identity>, StorageError>;

    /// Insert an identity with `nonce` unless one exists; returns the stored row
    async fn provision_identity(
        &self,
        address: &Address,
        nonce: Nonce,
    ) -> Result<Identity, StorageError>;

    /// Store a public key blob and move the nonce from `expected` to `new`
    ///
    /// Both writes happen together or not at all; `false` if the nonce no
    /// longer equals `expected` or the identity is unknown.
    async fn register_public_key(
        &self,
        address: &Address,
        public_key: String,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError>;

    /// Replace the identity nonce only if it still equals `expected`
    async fn swap_identity_nonce(
        &self,
        address: &Address,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError>;

    /// Number of provisioned identities
    async fn identity_count(&self) -> Result<usize, StorageError>;

    // =========================================================================
    // Encrypted Records
    // =========================================================================

    /// Store a new record with its first decrypt nonce and assign it an id
    async fn create_record(
        &self,
        record: NewRecord,
        nonce: Nonce,
    ) -> Result<EncryptedRecord, StorageError>;

    /// Get a record by id, visible only to its owner
    async fn get_record(
        &self,
        id: RecordId,
        owner: &Address,
    ) -> Result<Option<EncryptedRecord>, StorageError>;

    /// Summaries of an owner's records, newest first
    async fn list_records(&self, owner: &Address) -> Result<Vec<RecordSummary>, StorageError>;

    /// Replace the record nonce only if it still equals `expected`
    async fn swap_record_nonce(
        &self,
        id: RecordId,
        expected: &Nonce,
        new: &Nonce,
    ) -> Result<bool, StorageError>;

    /// Number of stored records
    async fn record_count(&self) -> Result<usize, StorageError>;
}
