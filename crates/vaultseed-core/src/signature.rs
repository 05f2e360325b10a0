//! Recoverable secp256k1 signature verification
//!
//! Messages are signed with the `personal_sign` framing: the text is prefixed
//! with `"\x19Ethereum Signed Message:\n"` and its decimal byte length, then
//! hashed with keccak256. Verification recovers the public key from the
//! 65-byte `r || s || v` signature, derives its address and compares it with
//! the claimed identity.
//!
//! The framing is load-bearing. A key cannot be tricked into producing a
//! signature over raw data that also verifies here, because the hash always
//! commits to the prefix and the declared length.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tracing::debug;

use crate::address::{keccak256, Address};
use crate::error::{Result, VaultError};

/// Length of a recoverable signature: 64 bytes of `r || s` plus one parity byte
pub const SIGNATURE_LEN: usize = 65;

/// Prefix of the signed-message framing
pub const SIGNED_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// y-parity of the ephemeral point, the information carried by `v`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    fn is_odd(self) -> bool {
        matches!(self, Parity::Odd)
    }

    fn flip(self) -> Self {
        match self {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        }
    }
}

/// Classification of a raw `v` byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityByte {
    /// `0|1`, legacy `27|28`, or chain-id encoded `>= 35`
    Recognized(Parity),
    /// Any other value; rejected rather than guessed
    Unrecognized(u8),
}

impl ParityByte {
    /// Classify a `v` byte
    pub fn classify(v: u8) -> Self {
        let parity = |bit: u8| {
            if bit == 0 {
                Parity::Even
            } else {
                Parity::Odd
            }
        };

        match v {
            0 | 1 => ParityByte::Recognized(parity(v)),
            27 | 28 => ParityByte::Recognized(parity(v - 27)),
            // v = chain_id * 2 + 35 + parity
            35.. => ParityByte::Recognized(parity((v - 35) % 2)),
            other => ParityByte::Unrecognized(other),
        }
    }
}

/// How to encode the parity byte when rendering a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityEncoding {
    /// `0` or `1`
    Canonical,
    /// `27` or `28`, as wallets emit for `personal_sign`
    Legacy,
}

/// A parsed 65-byte recoverable signature
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    rs: [u8; 64],
    parity: Parity,
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverableSignature")
            .field("rs", &hex::encode(self.rs))
            .field("parity", &self.parity)
            .finish()
    }
}

impl RecoverableSignature {
    /// Assemble from `r || s` and a parity
    pub fn new(rs: [u8; 64], parity: Parity) -> Self {
        Self { rs, parity }
    }

    /// Parse raw bytes; must be exactly 65 bytes with a recognized parity byte
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(VaultError::MalformedSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }

        let parity = match ParityByte::classify(bytes[64]) {
            ParityByte::Recognized(parity) => parity,
            ParityByte::Unrecognized(v) => return Err(VaultError::UnrecognizedParity(v)),
        };

        let mut rs = [0u8; 64];
        rs.copy_from_slice(&bytes[..64]);
        Ok(Self { rs, parity })
    }

    /// Parse a hex string, with or without `0x`
    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes =
            hex::decode(digits).map_err(|e| VaultError::MalformedSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The y-parity carried by this signature
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Encode as 65 bytes
    pub fn to_bytes(&self, encoding: ParityEncoding) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&self.rs);
        let bit = u8::from(self.parity.is_odd());
        out[64] = match encoding {
            ParityEncoding::Canonical => bit,
            ParityEncoding::Legacy => bit + 27,
        };
        out
    }

    /// Encode as `0x`-prefixed hex
    pub fn to_hex(&self, encoding: ParityEncoding) -> String {
        format!("0x{}", hex::encode(self.to_bytes(encoding)))
    }

    /// Recover the signer's public key from a 32-byte prehash
    pub fn recover(&self, prehash: &[u8; 32]) -> Result<VerifyingKey> {
        let mut signature = Signature::from_slice(&self.rs)
            .map_err(|e| VaultError::MalformedSignature(e.to_string()))?;
        let mut parity = self.parity;

        // High-s signatures are accepted by ecrecover; the low-s twin has the
        // opposite y-parity.
        if let Some(low) = signature.normalize_s() {
            signature = low;
            parity = parity.flip();
        }

        let recovery_id = RecoveryId::new(parity.is_odd(), false);
        VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
            .map_err(|e| VaultError::RecoveryFailed(e.to_string()))
    }
}

/// Strip what a signing UI may have wrapped around the message
///
/// Trims surrounding whitespace, removes one enclosing pair of double quotes,
/// then trims again. The result is the text that must have been signed.
pub fn normalize_message(message: &str) -> String {
    let trimmed = message.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unquoted.trim().to_string()
}

/// Hash a message exactly as given, under the signed-message framing
pub fn hash_message(message: &str) -> [u8; 32] {
    let bytes = message.as_bytes();
    let mut framed = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 20 + bytes.len());
    framed.extend_from_slice(SIGNED_MESSAGE_PREFIX.as_bytes());
    framed.extend_from_slice(bytes.len().to_string().as_bytes());
    framed.extend_from_slice(bytes);
    keccak256(&framed)
}

/// Recover the address that signed a framed-message hash
pub fn recover_address_from_hash(
    hash: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address> {
    let key = signature.recover(hash)?;
    Ok(Address::from_public_key(&key))
}

/// Recover the address that signed `message` (after normalization)
pub fn recover_address(message: &str, signature: &RecoverableSignature) -> Result<Address> {
    let normalized = normalize_message(message);
    recover_address_from_hash(&hash_message(&normalized), signature)
}

/// Stateless signature verifier
///
/// Every failure (bad hex, wrong length, unrecognized parity, failed recovery,
/// unparsable identity, or a different signer) is reported as `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Check that `signature` was produced by `claimed_identity` over `message`
    pub fn verify(message: &str, signature: &str, claimed_identity: &str) -> bool {
        let Ok(claimed) = Address::parse(claimed_identity) else {
            return false;
        };
        match RecoverableSignature::from_hex(signature) {
            Ok(parsed) => Self::verify_parsed(message, &parsed, &claimed),
            Err(e) => {
                debug!(error = %e, "Rejecting undecodable signature");
                false
            }
        }
    }

    /// Same as [`SignatureVerifier::verify`] for already-parsed inputs
    pub fn verify_parsed(
        message: &str,
        signature: &RecoverableSignature,
        claimed: &Address,
    ) -> bool {
        match recover_address(message, signature) {
            Ok(recovered) => recovered == *claimed,
            Err(e) => {
                debug!(error = %e, "Signature recovery failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
    const KNOWN_SIGNATURE: &str = "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c";

    #[test]
    fn test_hash_message_known_vectors() {
        assert_eq!(
            hex::encode(hash_message("Hello World")),
            "a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2"
        );
        assert_eq!(
            hex::encode(hash_message("Some data")),
            "1da44b586eb0729ff70a73c326926f6ed5a25f5b056e7f47fbc6e58d86871655"
        );
    }

    #[test]
    fn test_verify_known_wallet_signature() {
        assert!(SignatureVerifier::verify("Some data", KNOWN_SIGNATURE, KNOWN_ADDRESS));
    }

    #[test]
    fn test_verify_without_prefix() {
        let bare = KNOWN_SIGNATURE.trim_start_matches("0x");
        assert!(SignatureVerifier::verify("Some data", bare, KNOWN_ADDRESS));
    }

    #[test]
    fn test_verify_quoted_message() {
        assert!(SignatureVerifier::verify("  \"Some data\" ", KNOWN_SIGNATURE, KNOWN_ADDRESS));
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        assert!(!SignatureVerifier::verify("Some data!", KNOWN_SIGNATURE, KNOWN_ADDRESS));
    }

    #[test]
    fn test_trailing_space_changes_hash() {
        let sig = RecoverableSignature::from_hex(KNOWN_SIGNATURE).unwrap();
        let expected = Address::parse(KNOWN_ADDRESS).unwrap();

        let exact = recover_address_from_hash(&hash_message("Some data"), &sig).unwrap();
        assert_eq!(exact, expected);

        // Recovery against the padded hash yields some other key, or none
        match recover_address_from_hash(&hash_message("Some data "), &sig) {
            Ok(other) => assert_ne!(other, expected),
            Err(_) => {}
        }
    }

    #[test]
    fn test_unframed_hash_does_not_recover_signer() {
        let sig = RecoverableSignature::from_hex(KNOWN_SIGNATURE).unwrap();
        let expected = Address::parse(KNOWN_ADDRESS).unwrap();
        let raw = keccak256(b"Some data");
        if let Ok(other) = recover_address_from_hash(&raw, &sig) {
            assert_ne!(other, expected);
        }
    }

    #[test]
    fn test_parity_classification() {
        assert_eq!(ParityByte::classify(0), ParityByte::Recognized(Parity::Even));
        assert_eq!(ParityByte::classify(1), ParityByte::Recognized(Parity::Odd));
        assert_eq!(ParityByte::classify(27), ParityByte::Recognized(Parity::Even));
        assert_eq!(ParityByte::classify(28), ParityByte::Recognized(Parity::Odd));
        // chain id 1: 37/38
        assert_eq!(ParityByte::classify(37), ParityByte::Recognized(Parity::Even));
        assert_eq!(ParityByte::classify(38), ParityByte::Recognized(Parity::Odd));
        assert_eq!(ParityByte::classify(35), ParityByte::Recognized(Parity::Even));
        assert_eq!(ParityByte::classify(2), ParityByte::Unrecognized(2));
        assert_eq!(ParityByte::classify(29), ParityByte::Unrecognized(29));
        assert_eq!(ParityByte::classify(34), ParityByte::Unrecognized(34));
    }

    #[test]
    fn test_unrecognized_parity_rejected() {
        let mut bytes = hex::decode(KNOWN_SIGNATURE.trim_start_matches("0x")).unwrap();
        bytes[64] = 5;
        assert_eq!(
            RecoverableSignature::from_bytes(&bytes),
            Err(VaultError::UnrecognizedParity(5))
        );
        let encoded = format!("0x{}", hex::encode(&bytes));
        assert!(!SignatureVerifier::verify("Some data", &encoded, KNOWN_ADDRESS));
    }

    #[test]
    fn test_legacy_and_canonical_parity_agree() {
        let legacy = RecoverableSignature::from_hex(KNOWN_SIGNATURE).unwrap();
        let canonical_hex = legacy.to_hex(ParityEncoding::Canonical);
        assert!(canonical_hex.ends_with("01"));
        assert!(SignatureVerifier::verify("Some data", &canonical_hex, KNOWN_ADDRESS));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            RecoverableSignature::from_hex("0xdeadbeef"),
            Err(VaultError::MalformedSignature(_))
        ));
        let too_long = format!("{}00", KNOWN_SIGNATURE);
        assert!(!SignatureVerifier::verify("Some data", &too_long, KNOWN_ADDRESS));
    }

    #[test]
    fn test_non_hex_rejected() {
        assert!(!SignatureVerifier::verify("Some data", "0xnothex", KNOWN_ADDRESS));
        assert!(!SignatureVerifier::verify("Some data", "", KNOWN_ADDRESS));
    }

    #[test]
    fn test_zero_signature_rejected() {
        let zeros = format!("0x{}1b", "00".repeat(64));
        assert!(!SignatureVerifier::verify("Some data", &zeros, KNOWN_ADDRESS));
    }

    #[test]
    fn test_bad_claimed_identity_is_false() {
        assert!(!SignatureVerifier::verify("Some data", KNOWN_SIGNATURE, "not-an-address"));
    }

    #[test]
    fn test_normalize_message() {
        assert_eq!(normalize_message("  hello  "), "hello");
        assert_eq!(normalize_message("\"hello\""), "hello");
        assert_eq!(normalize_message(" \" hello \" "), "hello");
        assert_eq!(normalize_message("\"\"hello\"\""), "\"hello\"");
        assert_eq!(normalize_message("\""), "\"");
        assert_eq!(normalize_message("he said \"hi\""), "he said \"hi\"");
    }
}
