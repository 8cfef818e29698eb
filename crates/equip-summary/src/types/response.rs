//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use super::UploadRecord;

/// Acknowledgment returned by `POST /api/upload/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always "uploaded" on success
    pub message: String,
    /// Identifier of the new record
    pub id: i64,
    pub filename: String,
    pub uploaded_at: String,
    /// Records evicted to keep the history within capacity
    #[serde(default)]
    pub evicted: usize,
}

impl UploadResponse {
    pub fn accepted(record: &UploadRecord, evicted: usize) -> Self {
        Self {
            message: "uploaded".to_string(),
            id: record.id,
            filename: record.filename.clone(),
            uploaded_at: record.uploaded_at_display(),
            evicted,
        }
    }
}

/// Body of `POST /api/login/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token pair issued on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST /api/refresh/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Fresh access token issued on refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}
