//! equip-summary: equipment CSV summaries with a bounded upload history
//!
//! Uploaded CSV tables are reduced to a fixed-shape [`Summary`] (row count,
//! three column means and a type distribution), stored in a SQLite history
//! capped at the five most recent uploads, and exposed over an HTTP API with
//! a PDF report. A client library and CLI consume the same API.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod report;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use ingestion::{summarize, SummarySchema};
pub use report::{render_pdf, ReportView};
pub use storage::HistoryStore;
pub use types::{HistoryEntry, Summary, UploadRecord};
