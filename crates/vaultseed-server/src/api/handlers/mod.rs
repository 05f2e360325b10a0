//! API request handlers

pub mod auth;
pub mod content;

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use std::sync::Arc;
use vaultseed_core::Address;

use crate::access::{Authenticator, ContentAccessController, NonceStore};
use crate::api::error::ApiError;
use crate::config::ServerConfig;
use crate::keys::KeyRegistry;
use crate::storage::VaultStore;

pub use auth::{
    get_nonce, login, register_public_key, LoginRequest, LoginResponse, NonceQuery,
    NonceResponse, RegisterPublicKeyRequest, RegisterPublicKeyResponse,
};
pub use content::{
    create_content, decrypt_content, get_content, list_contents, ContentDetail,
    ContentDetailResponse, ContentSummary, CreateContentRequest, CreateContentResponse,
    DecryptRequest, DecryptResponse, ListContentsResponse,
};

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Credential signing and verification keys
    pub registry: Arc<KeyRegistry>,
    /// Identity and record storage
    pub store: Arc<dyn VaultStore>,
    /// Login and key registration
    pub authenticator: Authenticator,
    /// Record creation, listing and decrypt authorization
    pub content: ContentAccessController,
    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the access components over one store and one nonce lock table
    ///
    /// Retired keys from the configuration are registered for verification.
    pub fn new(config: ServerConfig, store: Arc<dyn VaultStore>, registry: KeyRegistry) -> Self {
        for key in &config.retired_keys {
            registry.register_verification_key(key.clone());
        }
        let registry = Arc::new(registry);
        let nonces = NonceStore::new(Arc::clone(&store));
        let authenticator = Authenticator::new(
            Arc::clone(&store),
            nonces.clone(),
            Arc::clone(&registry),
            config.service_name.clone(),
            config.credential_ttl,
        );
        let content = ContentAccessController::new(Arc::clone(&store), nonces);
        Self {
            registry,
            store,
            authenticator,
            content,
            config,
        }
    }
}

/// Identity resolved from a `Bearer` credential
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Address);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let address = state.authenticator.authenticate_credential(token).await?;
        Ok(Authenticated(address))
    }
}
