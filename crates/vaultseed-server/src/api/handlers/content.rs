//! Content Handlers
//!
//! All routes require a `Bearer` credential. Decrypt additionally requires a
//! fresh signature over the record's decrypt challenge.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vaultseed_core::RecordId;

use super::{AppState, Authenticated};
use crate::api::error::ApiError;
use crate::storage::{NewRecord, RecordSummary};

/// New encrypted record, already encrypted client-side
#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    pub title: String,
    pub encrypted_data: String,
    pub encrypted_key: String,
    pub iv: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContentResponse {
    pub success: bool,
    pub id: RecordId,
}

/// Record metadata as listed
#[derive(Debug, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecordSummary> for ContentSummary {
    fn from(summary: RecordSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            created_at: summary.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListContentsResponse {
    pub success: bool,
    pub contents: Vec<ContentSummary>,
}

/// Record metadata with the nonce for the next decrypt challenge
#[derive(Debug, Serialize, Deserialize)]
pub struct ContentDetail {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentDetailResponse {
    pub success: bool,
    pub content: ContentDetail,
}

/// Signed decrypt challenge for one record
#[derive(Debug, Deserialize)]
pub struct DecryptRequest {
    pub content_id: RecordId,
    pub message: String,
    pub nonce: String,
    pub signature: String,
}

/// Released ciphertext; decryption happens on the client
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub success: bool,
    pub content: ContentSummary,
    pub encrypted_data: String,
    pub encrypted_key: String,
    pub iv: String,
}

/// Store a new encrypted record
///
/// POST /api/content/create
pub async fn create_content(
    State(state): State<Arc<AppState>>,
    Authenticated(owner): Authenticated,
    Json(request): Json<CreateContentRequest>,
) -> Result<Json<CreateContentResponse>, ApiError> {
    let id = state
        .content
        .create_record(NewRecord {
            owner,
            title: request.title,
            ciphertext: request.encrypted_data,
            wrapped_key: request.encrypted_key,
            iv: request.iv,
        })
        .await?;

    Ok(Json(CreateContentResponse { success: true, id }))
}

/// List the caller's records
///
/// GET /api/content/list
pub async fn list_contents(
    State(state): State<Arc<AppState>>,
    Authenticated(owner): Authenticated,
) -> Result<Json<ListContentsResponse>, ApiError> {
    let contents = state
        .content
        .list_records(&owner)
        .await?
        .into_iter()
        .map(ContentSummary::from)
        .collect();

    Ok(Json(ListContentsResponse {
        success: true,
        contents,
    }))
}

/// Record metadata and current decrypt nonce
///
/// GET /api/content/{id}
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Authenticated(owner): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ContentDetailResponse>, ApiError> {
    let id: RecordId = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid content ID".into()))?;
    let detail = state.content.record_detail(id, &owner).await?;

    Ok(Json(ContentDetailResponse {
        success: true,
        content: ContentDetail {
            id: detail.id,
            title: detail.title,
            created_at: detail.created_at,
            nonce: detail.nonce.to_string(),
        },
    }))
}

/// Release ciphertext against a signed decrypt challenge
///
/// POST /api/content/decrypt
pub async fn decrypt_content(
    State(state): State<Arc<AppState>>,
    Authenticated(owner): Authenticated,
    Json(request): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let envelope = state
        .content
        .authorize_decrypt(
            request.content_id,
            &owner,
            &request.message,
            &request.nonce,
            &request.signature,
        )
        .await?;

    Ok(Json(DecryptResponse {
        success: true,
        content: ContentSummary {
            id: envelope.id,
            title: envelope.title,
            created_at: envelope.created_at,
        },
        encrypted_data: envelope.ciphertext,
        encrypted_key: envelope.wrapped_key,
        iv: envelope.iv,
    }))
}
