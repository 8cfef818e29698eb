//! Persisted upload records and their API representation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Summary;

/// Display format for upload timestamps in API payloads and reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Store-assigned identifier, increasing with every insert
    pub id: i64,
    /// File name as supplied by the uploader
    pub filename: String,
    /// Acceptance time, assigned by the store
    pub uploaded_at: DateTime<Utc>,
    /// Aggregates computed at acceptance time
    pub summary: Summary,
}

impl UploadRecord {
    /// Upload time rendered with [`TIMESTAMP_FORMAT`]
    pub fn uploaded_at_display(&self) -> String {
        self.uploaded_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// History entry as returned by `GET /api/history/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub filename: String,
    /// Human-readable upload time (UTC)
    pub uploaded_at: String,
    pub summary: Summary,
}

impl From<&UploadRecord> for HistoryEntry {
    fn from(record: &UploadRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename.clone(),
            uploaded_at: record.uploaded_at_display(),
            summary: record.summary.clone(),
        }
    }
}

impl From<UploadRecord> for HistoryEntry {
    fn from(record: UploadRecord) -> Self {
        let uploaded_at = record.uploaded_at_display();
        Self {
            id: record.id,
            filename: record.filename,
            uploaded_at,
            summary: record.summary,
        }
    }
}
