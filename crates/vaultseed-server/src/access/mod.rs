//! Authorization logic for VaultSeed
//!
//! Everything that decides whether a signed request may proceed lives here.
//! The HTTP layer only parses requests and renders the outcome.

pub mod authenticator;
pub mod content;
pub mod error;
pub mod nonce_store;

pub use authenticator::{Authenticator, IssuedCredential};
pub use content::{CiphertextEnvelope, ContentAccessController, RecordDetail, MAX_TITLE_LEN};
pub use error::{AccessError, ErrorClass};
pub use nonce_store::{NonceGuard, NonceKey, NonceStore};
