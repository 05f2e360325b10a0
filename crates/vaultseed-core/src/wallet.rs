//! Local secp256k1 signer
//!
//! The server never holds user keys. This is the client half of the protocol,
//! used by tooling and tests to produce signatures a browser wallet would.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::address::Address;
use crate::error::{Result, VaultError};
use crate::signature::{hash_message, Parity, RecoverableSignature};

/// A secp256k1 key able to sign challenge messages
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl Wallet {
    /// Generate a new random wallet
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Wrap an existing signing key
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Load a wallet from a 32-byte hex secret, with or without `0x`
    pub fn from_hex(secret: &str) -> Result<Self> {
        let digits = secret.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|e| VaultError::CryptoError(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| VaultError::CryptoError(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// The address this wallet signs as
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `message` exactly as given under the signed-message framing
    pub fn sign_message(&self, message: &str) -> Result<RecoverableSignature> {
        let hash = hash_message(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;

        let mut rs = [0u8; 64];
        rs.copy_from_slice(&signature.to_bytes());
        let parity = if recovery_id.is_y_odd() {
            Parity::Odd
        } else {
            Parity::Even
        };
        Ok(RecoverableSignature::new(rs, parity))
    }
}
