//! Token issuance endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AccessToken, LoginRequest, RefreshRequest, TokenPair};

/// POST /api/login/ - Exchange credentials for an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let pair = state
        .tokens()
        .login(&request.username, &request.password)
        .map_err(|e| {
            tracing::warn!("Failed login for '{}'", request.username);
            e
        })?;

    tracing::info!("User '{}' logged in", request.username);
    Ok(Json(pair))
}

/// POST /api/refresh/ - Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessToken>> {
    Ok(Json(state.tokens().refresh(&request.refresh)?))
}
