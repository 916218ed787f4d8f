//! HTTP handlers. Each one parses its request, calls into the folder layer
//! or the backing store, and shapes the JSON (or byte) response.

use crate::services::{folder_service::FolderService, storage_service::StorageService};

pub mod folder_handlers;
pub mod health_handlers;
pub mod object_handlers;
pub mod share_handlers;

/// Shared state carried by the router.
#[derive(Clone)]
pub struct AppState {
    pub folders: FolderService,
    /// Backing store, for raw byte transfer and readiness checks.
    pub storage: StorageService,
    pub default_share_ttl_secs: u64,
}
