//! API routes for the summary server

pub mod auth;
pub mod history;
pub mod report;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Token issuance
        .route("/login/", post(auth::login))
        .route("/refresh/", post(auth::refresh))
        // Upload - with larger body limit for file uploads
        .route(
            "/upload/",
            post(upload::upload_csv).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // History and reports
        .route("/history/", get(history::history))
        .route("/report/", get(report::report_pdf))
        .route("/report/view/", get(report::report_view))
        // Info
        .route("/info", get(info))
}

/// Run store and parsing work off the async executor
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("Blocking task failed: {}", e)))?
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "equip-summary",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Equipment CSV summaries with bounded history and PDF reports",
        "endpoints": {
            "POST /api/login/": "Obtain access and refresh tokens",
            "POST /api/refresh/": "Obtain a new access token",
            "POST /api/upload/": "Upload a CSV file (multipart field 'file')",
            "GET /api/history/": "Most recent uploads, newest first",
            "GET /api/report/": "PDF report of the latest upload",
            "GET /api/report/view/": "Report data as JSON"
        }
    }))
}
