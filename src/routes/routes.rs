//! Defines routes for the folder API and raw object transfer.
//!
//! ## Structure
//! - **Folder endpoints** (JSON)
//!   - `GET    /api/list?prefix=`     — one level, folders first
//!   - `GET    /api/tree?prefix=`     — lazy tree node
//!   - `POST   /api/folders`          — create folder marker
//!   - `POST   /api/rename`           — rename/move a file or subtree
//!   - `POST   /api/delete`           — delete a file or subtree
//!   - `POST   /api/drop`             — move many keys into one folder
//! - **Trash**
//!   - `GET    /api/trash`            — list trash
//!   - `POST   /api/trash`            — soft delete
//!   - `POST   /api/trash/restore`    — restore to a caller-given key
//!   - `DELETE /api/trash`            — empty trash
//! - **Shares**
//!   - `GET    /api/shares`           — live shares
//!   - `POST   /api/shares`           — issue a share
//!   - `GET    /api/shares/{token}`   — look a share up
//! - **Objects**
//!   - `PUT|GET|HEAD /objects/{*key}` — raw bytes
//!   - `GET    /presigned/{key}`      — target of issued share URLs
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.

use crate::handlers::{
    AppState,
    folder_handlers::{
        create_folder, delete, drop_many, empty_trash, list, list_trash, rename, restore,
        soft_delete, tree,
    },
    health_handlers::{healthz, readyz},
    object_handlers::{get_object, get_presigned, head_object, upload_object},
    share_handlers::{create_share, list_shares, lookup_share},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the router. Handlers share one [`AppState`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/list", get(list))
        .route("/api/tree", get(tree))
        .route("/api/folders", post(create_folder))
        .route("/api/rename", post(rename))
        .route("/api/delete", post(delete))
        .route("/api/drop", post(drop_many))
        .route(
            "/api/trash",
            get(list_trash).post(soft_delete).delete(empty_trash),
        )
        .route("/api/trash/restore", post(restore))
        .route("/api/shares", get(list_shares).post(create_share))
        .route("/api/shares/{token}", get(lookup_share))
        .route(
            "/objects/{*key}",
            put(upload_object).get(get_object).head(head_object),
        )
        .route("/presigned/{encoded_key}", get(get_presigned))
}
