//! VaultSeed Server
//!
//! Wallet-signature authentication and decrypt authorization for
//! client-encrypted records:
//! - Issues single-use nonces and canonical challenge messages
//! - Verifies secp256k1 signatures over those challenges
//! - Issues signed session credentials bound to the identity's nonce
//! - Releases stored ciphertext only against a fresh signed decrypt challenge
//!
//! The server never sees plaintext or user keys.
//!
//! ## API Endpoints
//!
//! ### Health
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with storage counts
//!
//! ### Authentication
//! - `GET /api/auth/nonce?address=` - Current nonce and login challenge
//! - `POST /api/auth/login` - Exchange a signed challenge for a credential
//! - `POST /api/auth/register-public-key` - Attach a public key blob
//!
//! ### Content (Bearer credential)
//! - `POST /api/content/create` - Store an encrypted record
//! - `GET /api/content/list` - List the caller's records
//! - `GET /api/content/{id}` - Record metadata and decrypt nonce
//! - `POST /api/content/decrypt` - Release ciphertext for a signed challenge

pub mod access;
pub mod api;
pub mod config;
pub mod keys;
pub mod storage;

pub use access::{AccessError, Authenticator, ContentAccessController, ErrorClass, NonceStore};
pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, ServerConfig};
pub use keys::KeyRegistry;
pub use storage::{MemoryStore, VaultStore};
#[cfg(feature = "postgres")]
pub use storage::PostgresStore;
