//! # VaultSeed Core
//!
//! Primitives for proving control of a secp256k1 key without ever handing
//! the key to the server, and for keeping each proof single-use.
//!
//! ## Key Concepts
//!
//! - **Address**: 20-byte identity derived from a secp256k1 public key
//! - **Nonce**: unguessable single-use token embedded in every challenge
//! - **Challenge**: the exact text a client signs for one operation
//! - **Recoverable signature**: 65-byte `r || s || v`, from which the signer's
//!   address is recovered and compared with the claimed one
//! - **Credential**: server-signed session token bound to the identity nonce
//!   that was current when it was issued
//!
//! ## Invariants
//!
//! 1. **Framing**: only messages signed under the signed-message prefix verify
//! 2. **Fail closed**: any malformed input verifies as `false`, never panics
//! 3. **Single use**: a challenge names a nonce; once that nonce is rotated the
//!    signature over it is worthless

pub mod address;
pub mod challenge;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod nonce;
pub mod signature;
pub mod wallet;

pub use address::{keccak256, Address};
pub use challenge::{Challenge, RecordId, DEFAULT_SERVICE_NAME};
pub use credential::CredentialClaims;
pub use crypto::{CoseSigned, KeyPair, PublicKey, SignedCredential};
pub use error::{Result, VaultError};
pub use nonce::Nonce;
pub use signature::{
    hash_message, normalize_message, recover_address, Parity, ParityByte, ParityEncoding,
    RecoverableSignature, SignatureVerifier,
};
pub use wallet::Wallet;
