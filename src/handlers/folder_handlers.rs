//! JSON handlers for listing, renaming, deleting, trashing and dropping.

use crate::{
    errors::AppError,
    handlers::AppState,
    models::{
        batch::BatchResult,
        entry::{Entry, Listing},
    },
    services::{
        mutator::{DeleteReport, RenameReport},
        trash::TrashReport,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, Default)]
pub struct PrefixQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderReq {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameReq {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyReq {
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReq {
    pub trash_key: String,
    pub original_key: String,
}

#[derive(Debug, Deserialize)]
pub struct DropReq {
    pub sources: Vec<String>,
    #[serde(default)]
    pub destination: String,
}

/// GET `/api/list?prefix=`
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<PrefixQuery>,
) -> Result<Json<Listing>, AppError> {
    Ok(Json(state.folders.list(&q.prefix).await?))
}

/// GET `/api/tree?prefix=` — children of one lazily expanded node.
pub async fn tree(
    State(state): State<AppState>,
    Query(q): Query<PrefixQuery>,
) -> Result<Json<Vec<Entry>>, AppError> {
    Ok(Json(state.folders.hierarchy_node(&q.prefix).await?))
}

/// POST `/api/folders`
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderReq>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let key = state.folders.create_folder(&req.path).await?;
    Ok((StatusCode::CREATED, Json(json!({ "key": key }))))
}

/// POST `/api/rename` — leaf or subtree, depending on the trailing `/`.
pub async fn rename(
    State(state): State<AppState>,
    Json(req): Json<RenameReq>,
) -> Result<Json<RenameReport>, AppError> {
    Ok(Json(state.folders.rename(&req.from, &req.to).await?))
}

/// POST `/api/delete`
pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<KeyReq>,
) -> Result<Json<DeleteReport>, AppError> {
    Ok(Json(state.folders.delete(&req.key).await?))
}

/// POST `/api/drop` — the batch outcome is always 200; `success` tells the rest.
pub async fn drop_many(
    State(state): State<AppState>,
    Json(req): Json<DropReq>,
) -> Result<Json<BatchResult>, AppError> {
    Ok(Json(
        state
            .folders
            .drop_many(&req.sources, &req.destination)
            .await?,
    ))
}

/// GET `/api/trash`
pub async fn list_trash(State(state): State<AppState>) -> Result<Json<Listing>, AppError> {
    Ok(Json(state.folders.list_trash().await?))
}

/// POST `/api/trash`
pub async fn soft_delete(
    State(state): State<AppState>,
    Json(req): Json<KeyReq>,
) -> Result<Json<TrashReport>, AppError> {
    Ok(Json(state.folders.soft_delete(&req.key).await?))
}

/// POST `/api/trash/restore`
pub async fn restore(
    State(state): State<AppState>,
    Json(req): Json<RestoreReq>,
) -> Result<Json<TrashReport>, AppError> {
    Ok(Json(
        state
            .folders
            .restore(&req.trash_key, &req.original_key)
            .await?,
    ))
}

/// DELETE `/api/trash`
pub async fn empty_trash(State(state): State<AppState>) -> Result<Json<DeleteReport>, AppError> {
    Ok(Json(state.folders.empty_trash().await?))
}
