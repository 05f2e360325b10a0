//! Server-side credential signing
//!
//! Credentials are COSE_Sign1 structures signed with the server's Ed25519
//! key. The key ID travels in the protected header so a verifier can pick the
//! right public key after a key rollover.
//!
//! Key types:
//! - `KeyPair`: Ed25519 key pair for signing
//! - `PublicKey`: Ed25519 public key for verification
//! - `SignedCredential`: COSE_Sign1 wrapped credential claims

use base64::{engine::general_purpose::STANDARD, Engine};
use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::credential::CredentialClaims;
use crate::error::{Result, VaultError};

/// COSE algorithm identifier for EdDSA (Ed25519)
const EDDSA_ALG: iana::Algorithm = iana::Algorithm::EdDSA;

/// A signed COSE_Sign1 structure
#[derive(Debug, Clone)]
pub struct CoseSigned<T> {
    /// The COSE_Sign1 structure
    cose: CoseSign1,
    /// Phantom type marker
    _marker: std::marker::PhantomData<T>,
}

/// Signed credential (COSE_Sign1 wrapped)
pub type SignedCredential = CoseSigned<CredentialClaims>;

impl<T> CoseSigned<T> {
    /// Get the key ID from the protected header
    pub fn kid(&self) -> Option<String> {
        let kid = &self.cose.protected.header.key_id;
        if kid.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(kid).to_string())
        }
    }

    /// Get the signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.cose.signature
    }

    /// Serialize to CBOR bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.cose.clone().to_vec().map_err(VaultError::from)
    }

    /// Deserialize from CBOR bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cose = CoseSign1::from_slice(bytes).map_err(VaultError::from)?;
        Ok(Self {
            cose,
            _marker: std::marker::PhantomData,
        })
    }
}

impl SignedCredential {
    /// Encode for transport (standard base64 of the CBOR bytes)
    pub fn to_token(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// Decode a transported token
    pub fn from_token(token: &str) -> Result<Self> {
        let bytes = STANDARD.decode(token.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Extract and deserialize the claims from the payload
    ///
    /// Note: This does NOT verify the signature. Use `PublicKey::verify_credential` for that.
    pub fn extract_claims(&self) -> Result<CredentialClaims> {
        let payload = self
            .cose
            .payload
            .as_ref()
            .ok_or(VaultError::MissingField("payload".into()))?;
        CredentialClaims::from_bytes(payload)
    }
}

/// Ed25519 key pair for signing credentials
#[derive(Clone)]
pub struct KeyPair {
    /// Key identifier
    kid: String,
    /// Ed25519 signing key (private)
    signing_key: SigningKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate(kid: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from a 32-byte seed
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Self {
        Self {
            kid: kid.into(),
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Create a key pair from a 64-character hex seed
    pub fn from_hex(kid: impl Into<String>, seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::CryptoError("Invalid key length: expected 32 bytes".into()))?;
        Ok(Self::from_bytes(kid, &bytes))
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            kid: self.kid.clone(),
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign credential claims and wrap in COSE_Sign1
    pub fn sign_credential(&self, claims: &CredentialClaims) -> Result<SignedCredential> {
        let payload = claims.to_bytes()?;
        let cose = self.sign_cose(&payload)?;
        Ok(CoseSigned {
            cose,
            _marker: std::marker::PhantomData,
        })
    }

    fn sign_cose(&self, payload: &[u8]) -> Result<CoseSign1> {
        let protected = HeaderBuilder::new()
            .algorithm(EDDSA_ALG)
            .key_id(self.kid.as_bytes().to_vec())
            .build();

        let builder = CoseSign1Builder::new()
            .protected(protected)
            .payload(payload.to_vec());

        let signed_builder = builder.try_create_signature(&[], |data| {
            let signature = self.signing_key.sign(data);
            Ok::<_, VaultError>(signature.to_bytes().to_vec())
        })?;

        Ok(signed_builder.build())
    }
}

/// Ed25519 public key for verification
#[derive(Clone)]
pub struct PublicKey {
    /// Key identifier
    kid: String,
    /// Ed25519 verifying key
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("kid", &self.kid).finish()
    }
}

impl PublicKey {
    /// Create a public key from raw bytes
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)?;
        Ok(Self {
            kid: kid.into(),
            verifying_key,
        })
    }

    /// Create a public key from 64 hex characters
    pub fn from_hex(kid: impl Into<String>, key: &str) -> Result<Self> {
        let bytes = hex::decode(key.trim().trim_start_matches("0x"))
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::CryptoError("Invalid key length: expected 32 bytes".into()))?;
        Self::from_bytes(kid, &bytes)
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Get the raw verifying key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify a signed credential and extract its claims
    ///
    /// Expiry and nonce binding are not checked here.
    pub fn verify_credential(&self, signed: &SignedCredential) -> Result<CredentialClaims> {
        self.verify_cose(&signed.cose)?;
        signed.extract_claims()
    }

    fn verify_cose(&self, cose: &CoseSign1) -> Result<()> {
        let kid = &cose.protected.header.key_id;
        if !kid.is_empty() {
            let kid_str = String::from_utf8_lossy(kid);
            if kid_str != self.kid {
                return Err(VaultError::CryptoError(format!(
                    "Key ID mismatch: expected '{}', got '{}'",
                    self.kid, kid_str
                )));
            }
        }

        let sig_structure = cose.tbs_data(&[]);

        let signature_bytes: [u8; 64] = cose
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::CryptoError("Invalid signature length".into()))?;
        let signature = Signature::from_bytes(&signature_bytes);

        self.verifying_key
            .verify(&sig_structure, &signature)
            .map_err(|e| VaultError::CryptoError(e.to_string()))
    }
}
