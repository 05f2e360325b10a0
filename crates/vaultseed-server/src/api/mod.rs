//! API module for the VaultSeed server

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ApiError;
use handlers::AppState;

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub credential_kid: String,
    pub verification_keys: usize,
    pub identity_count: usize,
    pub record_count: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<ReadyResponse>, ApiError> {
    let identity_count = state
        .store
        .identity_count()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let record_count = state
        .store
        .record_count()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ReadyResponse {
        ready: true,
        credential_kid: state.registry.kid().to_string(),
        verification_keys: state.registry.verification_key_count(),
        identity_count,
        record_count,
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser wallets call from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/health", get(health))
        // Authentication endpoints
        .route("/api/auth/nonce", get(handlers::get_nonce))
        .route("/api/auth/login", post(handlers::login))
        .route(
            "/api/auth/register-public-key",
            post(handlers::register_public_key),
        )
        // Content endpoints
        .route("/api/content/create", post(handlers::create_content))
        .route("/api/content/list", get(handlers::list_contents))
        .route("/api/content/decrypt", post(handlers::decrypt_content))
        .route("/api/content/{id}", get(handlers::get_content))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
