//! Attack Scenario Tests
//!
//! These tests verify that specific attack patterns against the signature
//! gate are prevented. Each test represents a real-world attack scenario that
//! must be blocked.

use std::sync::Arc;

use vaultseed_core::{Address, Challenge, Nonce, ParityEncoding, Wallet};
use vaultseed_server::storage::NewRecord;
use vaultseed_server::{
    AccessError, AppState, ErrorClass, KeyRegistry, MemoryStore, ServerConfig, VaultStore,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn setup() -> (Arc<dyn VaultStore>, Arc<AppState>) {
    let store: Arc<dyn VaultStore> = Arc::new(MemoryStore::new());
    let state = AppState::new(
        ServerConfig::default(),
        Arc::clone(&store),
        KeyRegistry::generate("attacks"),
    );
    (store, Arc::new(state))
}

fn sign(wallet: &Wallet, message: &str) -> String {
    wallet
        .sign_message(message)
        .expect("signing failed")
        .to_hex(ParityEncoding::Legacy)
}

async fn create_record(state: &AppState, owner: Address) -> u64 {
    state
        .content
        .create_record(NewRecord {
            owner,
            title: "secret".into(),
            ciphertext: "opaque".into(),
            wrapped_key: "wrapped".into(),
            iv: "iv".into(),
        })
        .await
        .expect("record creation failed")
}

async fn login(state: &AppState, wallet: &Wallet) -> String {
    let address = wallet.address();
    let nonce = state
        .authenticator
        .get_or_issue_nonce(&address.to_string())
        .await
        .unwrap();
    let message = state.authenticator.challenge(&address, &nonce).message();
    state
        .authenticator
        .login(&address.to_string(), &message, &sign(wallet, &message))
        .await
        .expect("login failed")
        .token
}

// =============================================================================
// ATTACK: Provisioning Login
// =============================================================================

/// An attacker who holds a key signs arbitrary text and tries to log in as a
/// never-seen address in one step. The identity is provisioned but the login
/// is refused; the signature over arbitrary text stays useless.
#[tokio::test]
async fn attack_provisioning_login_prevented() {
    let (store, state) = setup();
    let wallet = Wallet::generate();
    let address = wallet.address();
    let signature = sign(&wallet, "hello");

    let err = state
        .authenticator
        .login(&address.to_string(), "hello", &signature)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::ChallengeNotIssued));

    let provisioned = store.get_identity(&address).await.unwrap();
    assert!(provisioned.is_some(), "identity is provisioned with a nonce");

    let retry = state
        .authenticator
        .login(&address.to_string(), "hello", &signature)
        .await
        .unwrap_err();
    assert_eq!(retry.class(), ErrorClass::Unauthorized);
}

// =============================================================================
// ATTACK: Replay
// =============================================================================

/// A captured decrypt authorization is replayed after the owner used it.
#[tokio::test]
async fn attack_decrypt_replay_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let owner = wallet.address();
    let id = create_record(&state, owner).await;

    let nonce = state.content.get_record_nonce(id, &owner).await.unwrap();
    let message = Challenge::decrypt(id, &nonce).message();
    let signature = sign(&wallet, &message);

    state
        .content
        .authorize_decrypt(id, &owner, &message, nonce.as_str(), &signature)
        .await
        .unwrap();

    for _ in 0..3 {
        let err = state
            .content
            .authorize_decrypt(id, &owner, &message, nonce.as_str(), &signature)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Unauthorized);
    }
}

/// A login signature cannot be reused as a decrypt authorization.
#[tokio::test]
async fn attack_cross_purpose_signature_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let owner = wallet.address();
    let id = create_record(&state, owner).await;

    let login_nonce = state
        .authenticator
        .get_or_issue_nonce(&owner.to_string())
        .await
        .unwrap();
    let login_message = state.authenticator.challenge(&owner, &login_nonce).message();
    let signature = sign(&wallet, &login_message);

    let record_nonce = state.content.get_record_nonce(id, &owner).await.unwrap();
    let err = state
        .content
        .authorize_decrypt(id, &owner, &login_message, record_nonce.as_str(), &signature)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unauthorized);
}

// =============================================================================
// ATTACK: Concurrent Double Submission
// =============================================================================

/// The same decrypt signature is submitted many times at once. Exactly one
/// submission may win the nonce.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn attack_concurrent_decrypt_double_submit_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let owner = wallet.address();
    let id = create_record(&state, owner).await;

    let nonce = state.content.get_record_nonce(id, &owner).await.unwrap();
    let message = Challenge::decrypt(id, &nonce).message();
    let signature = sign(&wallet, &message);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let state = Arc::clone(&state);
        let message = message.clone();
        let nonce = nonce.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            state
                .content
                .authorize_decrypt(id, &owner, &message, nonce.as_str(), &signature)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1, "exactly one concurrent submission may succeed");
}

/// The same login signature is submitted many times at once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn attack_concurrent_login_double_submit_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let address = wallet.address();

    let nonce = state
        .authenticator
        .get_or_issue_nonce(&address.to_string())
        .await
        .unwrap();
    let message = state.authenticator.challenge(&address, &nonce).message();
    let signature = sign(&wallet, &message);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let state = Arc::clone(&state);
        let message = message.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            state
                .authenticator
                .login(&address.to_string(), &message, &signature)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

// =============================================================================
// ATTACK: Ownership Probing
// =============================================================================

/// Bob signs a valid decrypt challenge for Alice's record. The refusal must be
/// indistinguishable from asking for a record that does not exist.
#[tokio::test]
async fn attack_foreign_record_enumeration_prevented() {
    let (_, state) = setup();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let id = create_record(&state, alice.address()).await;

    let nonce = state
        .content
        .get_record_nonce(id, &alice.address())
        .await
        .unwrap();
    let message = Challenge::decrypt(id, &nonce).message();
    let signature = sign(&bob, &message);

    let foreign = state
        .content
        .authorize_decrypt(id, &bob.address(), &message, nonce.as_str(), &signature)
        .await
        .unwrap_err();

    let missing_id = id + 1000;
    let missing_message = Challenge::decrypt(missing_id, &nonce).message();
    let missing = state
        .content
        .authorize_decrypt(
            missing_id,
            &bob.address(),
            &missing_message,
            nonce.as_str(),
            &sign(&bob, &missing_message),
        )
        .await
        .unwrap_err();

    assert_eq!(foreign.class(), ErrorClass::NotFound);
    assert_eq!(foreign.class(), missing.class());
    assert_eq!(foreign.to_string(), missing.to_string());

    // Alice's nonce was not disturbed
    assert_eq!(
        state
            .content
            .get_record_nonce(id, &alice.address())
            .await
            .unwrap(),
        nonce
    );
}

// =============================================================================
// ATTACK: Oracle Probing
// =============================================================================

/// A forged signature and a guessed nonce produce the same error class.
#[tokio::test]
async fn attack_error_oracle_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let mallory = Wallet::generate();
    let owner = wallet.address();
    let id = create_record(&state, owner).await;
    let nonce = state.content.get_record_nonce(id, &owner).await.unwrap();

    let message = Challenge::decrypt(id, &nonce).message();
    let forged = state
        .content
        .authorize_decrypt(id, &owner, &message, nonce.as_str(), &sign(&mallory, &message))
        .await
        .unwrap_err();

    let guessed = Nonce::generate();
    let guessed_message = Challenge::decrypt(id, &guessed).message();
    let stale = state
        .content
        .authorize_decrypt(
            id,
            &owner,
            &guessed_message,
            guessed.as_str(),
            &sign(&wallet, &guessed_message),
        )
        .await
        .unwrap_err();

    assert!(matches!(forged, AccessError::SignatureInvalid));
    assert!(matches!(stale, AccessError::NonceMismatch));
    assert_eq!(forged.class(), stale.class());
}

// =============================================================================
// ATTACK: Malformed Signatures
// =============================================================================

/// A parity byte outside every known convention is refused rather than
/// silently treated as 0.
#[tokio::test]
async fn attack_unrecognized_parity_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();
    let address = wallet.address();
    let nonce = state
        .authenticator
        .get_or_issue_nonce(&address.to_string())
        .await
        .unwrap();
    let message = state.authenticator.challenge(&address, &nonce).message();

    let mut bytes = wallet
        .sign_message(&message)
        .unwrap()
        .to_bytes(ParityEncoding::Canonical);
    for v in [2u8, 7, 26, 29, 34] {
        bytes[64] = v;
        let signature = format!("0x{}", hex::encode(bytes));
        let err = state
            .authenticator
            .login(&address.to_string(), &message, &signature)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Unauthorized, "parity byte {}", v);
    }

    // nonce untouched by any of the refusals
    assert_eq!(
        state
            .authenticator
            .get_or_issue_nonce(&address.to_string())
            .await
            .unwrap(),
        nonce
    );
}

// =============================================================================
// ATTACK: Stale Credential
// =============================================================================

/// A credential leaked before the owner's next login stops working.
#[tokio::test]
async fn attack_stale_credential_prevented() {
    let (_, state) = setup();
    let wallet = Wallet::generate();

    let leaked = login(&state, &wallet).await;
    assert!(state
        .authenticator
        .authenticate_credential(&leaked)
        .await
        .is_ok());

    let _fresh = login(&state, &wallet).await;
    let err = state
        .authenticator
        .authenticate_credential(&leaked)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unauthorized);
}

/// A credential from a different server key is not accepted.
#[tokio::test]
async fn attack_forged_credential_prevented() {
    let (_, state) = setup();
    let (_, other) = setup();
    let wallet = Wallet::generate();

    // same identity exists on both servers with the same nonce flow
    let foreign = login(&other, &wallet).await;
    let err = state
        .authenticator
        .authenticate_credential(&foreign)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unauthorized);
}
