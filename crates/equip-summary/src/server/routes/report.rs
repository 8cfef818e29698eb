//! Report export endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::blocking;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::report::{render_pdf, ReportView};
use crate::server::state::AppState;

/// Assemble the view from one consistent read of the history
fn load_view(state: &AppState) -> Result<ReportView> {
    let recent = state.store().list_recent(state.history_limit())?;
    Ok(ReportView::assemble(recent.first(), &recent))
}

/// GET /api/report/ - PDF report of the latest upload and recent trend
///
/// An empty history still yields a valid document.
pub async fn report_pdf(State(state): State<AppState>, user: AuthUser) -> Result<Response> {
    let pdf = blocking(move || {
        let view = load_view(&state)?;
        render_pdf(&view)
    })
    .await?;

    tracing::info!("Rendered report for '{}' ({} bytes)", user.username, pdf.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"report.pdf\""),
        ],
        pdf,
    )
        .into_response())
}

/// GET /api/report/view/ - The report view as JSON, for client-side rendering
pub async fn report_view(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ReportView>> {
    let view = blocking(move || load_view(&state)).await?;
    Ok(Json(view))
}
