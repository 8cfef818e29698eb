//! Core types for the summary service

pub mod response;
pub mod summary;
pub mod upload_record;

pub use response::{AccessToken, LoginRequest, RefreshRequest, TokenPair, UploadResponse};
pub use summary::Summary;
pub use upload_record::{HistoryEntry, UploadRecord, TIMESTAMP_FORMAT};
