//! Share issuance and lookup.

use crate::{
    errors::AppError,
    handlers::AppState,
    models::share::{ShareRecord, ShareRecordSummary},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareReq {
    pub key: String,
    /// Falls back to the configured default.
    pub ttl_seconds: Option<u64>,
}

/// POST `/api/shares`
pub async fn create_share(
    State(state): State<AppState>,
    Json(req): Json<CreateShareReq>,
) -> Result<(StatusCode, Json<ShareRecord>), AppError> {
    let ttl = req.ttl_seconds.unwrap_or(state.default_share_ttl_secs);
    let record = state.folders.create_share(&req.key, ttl).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/api/shares` — live shares only.
pub async fn list_shares(State(state): State<AppState>) -> Json<Vec<ShareRecordSummary>> {
    Json(state.folders.list_shares())
}

/// GET `/api/shares/{token}`
pub async fn lookup_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ShareRecord>, AppError> {
    Ok(Json(state.folders.lookup_share(&token).await?))
}
