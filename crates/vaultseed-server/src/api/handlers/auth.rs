//! Authentication Handlers
//!
//! Wallet login is a two-step exchange: fetch the nonce and challenge text for
//! an address, then post the challenge signed by that address's key.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::access::authenticator::parse_address;
use crate::api::error::ApiError;

/// Query for a login nonce
#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub address: String,
}

/// Nonce and the exact challenge text to sign
#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
    pub message: String,
}

/// Signed login challenge
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
}

/// Issued session credential
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    /// Base64 credential to send as `Authorization: Bearer <token>`
    pub token: String,
    pub address: String,
    pub expires_at: DateTime<Utc>,
}

/// Public key registration signed over the current login challenge
#[derive(Debug, Deserialize)]
pub struct RegisterPublicKeyRequest {
    pub address: String,
    pub public_key: String,
    pub message: String,
    pub signature: String,
}

/// Replacement credential after registration
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPublicKeyResponse {
    pub success: bool,
    pub token: String,
}

/// Issue (or return the outstanding) login nonce
///
/// GET /api/auth/nonce?address=0x...
pub async fn get_nonce(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, ApiError> {
    let address = parse_address(&query.address)?;
    let nonce = state
        .authenticator
        .get_or_issue_nonce(&query.address)
        .await?;
    let message = state.authenticator.challenge(&address, &nonce).message();

    Ok(Json(NonceResponse {
        nonce: nonce.to_string(),
        message,
    }))
}

/// Exchange a signed challenge for a credential
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credential = state
        .authenticator
        .login(&request.address, &request.message, &request.signature)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        token: credential.token,
        address: credential.address.to_string(),
        expires_at: credential.expires_at,
    }))
}

/// Register a public key for an existing identity
///
/// POST /api/auth/register-public-key
pub async fn register_public_key(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterPublicKeyRequest>,
) -> Result<Json<RegisterPublicKeyResponse>, ApiError> {
    let credential = state
        .authenticator
        .register_public_key(
            &request.address,
            &request.public_key,
            &request.message,
            &request.signature,
        )
        .await?;

    Ok(Json(RegisterPublicKeyResponse {
        success: true,
        token: credential.token,
    }))
}
