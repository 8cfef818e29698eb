//! CSV upload endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::path::Path;
use std::time::Instant;

use super::blocking;
use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::ingestion::summarize;
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the CSV file
const FILE_FIELD: &str = "file";

/// POST /api/upload/ - Summarize a CSV file and append it to the history
///
/// The summary is computed before anything is written, so a rejected upload
/// leaves the history untouched.
pub async fn upload_csv(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let start = Instant::now();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("upload.csv")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;

        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .ok_or_else(|| Error::BadRequest(format!("missing multipart field '{}'", FILE_FIELD)))?;

    tracing::info!(
        "Upload from '{}': {} ({} bytes)",
        user.username,
        filename,
        data.len()
    );

    let task_state = state.clone();
    let outcome = blocking(move || {
        let summary = summarize(&filename, &data, task_state.schema())?;
        task_state.store().append(&filename, &summary)
    })
    .await
    .map_err(|e| {
        tracing::warn!("Rejected upload: {}", e);
        e
    })?;

    tracing::info!(
        "Stored upload {} ('{}', {} rows) in {:.1}ms",
        outcome.record.id,
        outcome.record.filename,
        outcome.record.summary.total_equipment(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse::accepted(&outcome.record, outcome.evicted)),
    ))
}

/// Body-limit rejections surface as 413, everything else as a malformed request
fn multipart_error(context: &str, err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(format!("{}: {}", context, err.body_text()))
    } else {
        Error::BadRequest(format!("{}: {}", context, err))
    }
}
