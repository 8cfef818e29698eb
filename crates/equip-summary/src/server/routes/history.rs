//! Upload history endpoint

use axum::{extract::State, Json};

use super::blocking;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::HistoryEntry;

/// GET /api/history/ - Most recent uploads, newest first
pub async fn history(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<HistoryEntry>>> {
    let limit = state.history_limit();
    let records = blocking(move || state.store().list_recent(limit)).await?;

    Ok(Json(records.into_iter().map(HistoryEntry::from).collect()))
}
