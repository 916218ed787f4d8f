//! FolderService — one handle over every folder operation for a single store.
//!
//! Components share the store and settings; the share registry is the only
//! piece with state of its own.

use crate::{
    models::{
        batch::BatchResult,
        entry::{Entry, Listing},
        key,
        share::{ShareRecord, ShareRecordSummary},
    },
    services::{
        batch_drop::BatchDropCoordinator,
        folder_error::FolderResult,
        listing::Resolver,
        mutator::{DeleteReport, Mutator, RenameReport},
        object_store::{MAX_LIST_KEYS, ObjectStore},
        share_registry::ShareRegistry,
        trash::{TrashManager, TrashReport},
    },
};
use std::sync::Arc;

pub const DEFAULT_TRASH_PREFIX: &str = ".trash/";

/// Knobs shared by the folder components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderSettings {
    /// Reserved prefix for soft-deleted items; always ends in `/`.
    pub trash_prefix: String,
    /// Keys requested per scan page.
    pub page_size: usize,
}

impl Default for FolderSettings {
    fn default() -> Self {
        Self {
            trash_prefix: DEFAULT_TRASH_PREFIX.to_string(),
            page_size: MAX_LIST_KEYS,
        }
    }
}

impl FolderSettings {
    /// Normalise the trash prefix and clamp the page size. An empty trash
    /// prefix falls back to the default.
    pub fn new(trash_prefix: &str, page_size: usize) -> Self {
        let trash_prefix = match key::normalize_folder(trash_prefix) {
            prefix if prefix.is_empty() => DEFAULT_TRASH_PREFIX.to_string(),
            prefix => prefix,
        };
        Self {
            trash_prefix,
            page_size: page_size.clamp(1, MAX_LIST_KEYS),
        }
    }
}

#[derive(Clone)]
pub struct FolderService {
    resolver: Resolver,
    mutator: Mutator,
    trash: TrashManager,
    batch: BatchDropCoordinator,
    shares: Arc<ShareRegistry>,
}

impl FolderService {
    pub fn new(store: Arc<dyn ObjectStore>, settings: FolderSettings) -> Self {
        let shares = Arc::new(ShareRegistry::new(store.clone()));
        Self::with_registry(store, settings, shares)
    }

    pub fn with_registry(
        store: Arc<dyn ObjectStore>,
        settings: FolderSettings,
        shares: Arc<ShareRegistry>,
    ) -> Self {
        let settings = Arc::new(settings);
        let resolver = Resolver::new(store.clone(), settings.clone());
        let mutator = Mutator::new(store.clone(), settings.clone());
        let trash = TrashManager::new(mutator.clone(), resolver.clone(), settings.clone());
        let batch = BatchDropCoordinator::new(mutator.clone());
        Self {
            resolver,
            mutator,
            trash,
            batch,
            shares,
        }
    }

    pub fn shares(&self) -> &Arc<ShareRegistry> {
        &self.shares
    }

    pub async fn list(&self, prefix: &str) -> FolderResult<Listing> {
        self.resolver.list(prefix).await
    }

    pub async fn hierarchy_node(&self, prefix: &str) -> FolderResult<Vec<Entry>> {
        self.resolver.hierarchy_node(prefix).await
    }

    pub async fn create_folder(&self, path: &str) -> FolderResult<String> {
        self.mutator.create_folder(path).await
    }

    pub async fn rename(&self, old_key: &str, new_key: &str) -> FolderResult<RenameReport> {
        self.mutator.rename(old_key, new_key).await
    }

    pub async fn move_into(&self, key: &str, destination: &str) -> FolderResult<RenameReport> {
        self.mutator.move_into(key, destination).await
    }

    pub async fn delete(&self, key: &str) -> FolderResult<DeleteReport> {
        self.mutator.delete(key).await
    }

    pub fn trash_key_of(&self, key: &str) -> String {
        self.trash.trash_key_of(key)
    }

    pub async fn soft_delete(&self, key: &str) -> FolderResult<TrashReport> {
        self.trash.soft_delete(key).await
    }

    pub async fn restore(&self, trash_key: &str, original_key: &str) -> FolderResult<TrashReport> {
        self.trash.restore(trash_key, original_key).await
    }

    pub async fn list_trash(&self) -> FolderResult<Listing> {
        self.trash.list().await
    }

    pub async fn empty_trash(&self) -> FolderResult<DeleteReport> {
        self.trash.empty().await
    }

    pub async fn drop_many(
        &self,
        source_keys: &[String],
        destination: &str,
    ) -> FolderResult<BatchResult> {
        self.batch.drop_many(source_keys, destination).await
    }

    pub async fn create_share(&self, key: &str, ttl_secs: u64) -> FolderResult<ShareRecord> {
        self.shares.create(key, ttl_secs).await
    }

    pub async fn lookup_share(&self, token: &str) -> FolderResult<ShareRecord> {
        self.shares.lookup(token).await
    }

    pub fn list_shares(&self) -> Vec<ShareRecordSummary> {
        self.shares.list()
    }
}
