//! One-level views over a prefix: the flat listing and lazy tree nodes.

use crate::{
    models::{
        entry::{Entry, FileEntry, FolderEntry, Listing, MimeClass},
        key,
    },
    services::{
        folder_error::{FolderError, FolderResult},
        folder_service::FolderSettings,
        object_store::ObjectStore,
    },
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ObjectStore>,
    settings: Arc<FolderSettings>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ObjectStore>, settings: Arc<FolderSettings>) -> Self {
        Self { store, settings }
    }

    /// Immediate children of `prefix`, folders first. The reserved trash
    /// folder is left out.
    pub async fn list(&self, prefix: &str) -> FolderResult<Listing> {
        let mut listing = self.list_level(prefix).await?;
        let trash = &self.settings.trash_prefix;
        listing.folders.retain(|folder| &folder.key != trash);
        Ok(listing)
    }

    /// Children of one tree node. Nothing below the node is fetched until
    /// the client expands a child.
    pub async fn hierarchy_node(&self, prefix: &str) -> FolderResult<Vec<Entry>> {
        Ok(self.list(prefix).await?.into_entries())
    }

    /// Listing without the trash filter; the trash manager lists its own prefix.
    pub(crate) async fn list_level(&self, prefix: &str) -> FolderResult<Listing> {
        let prefix = key::normalize_folder(prefix);
        if !prefix.is_empty() {
            key::validate_key(&prefix).map_err(|v| FolderError::invalid_key(&prefix, v))?;
        }

        let location = self.store.location();
        let scan = self
            .store
            .scan(&prefix, Some("/"), self.settings.page_size)
            .await
            .map_err(|err| FolderError::upstream("list", &prefix, &location, err))?;

        let mut folders: Vec<FolderEntry> = scan
            .common_prefixes
            .into_iter()
            .map(|group| FolderEntry {
                display_name: key::display_name(&group).to_string(),
                key: group,
            })
            .collect();

        // The folder's own marker is not one of its children.
        let mut files: Vec<FileEntry> = scan
            .objects
            .into_iter()
            .filter(|obj| obj.key != prefix)
            .map(|obj| FileEntry {
                display_name: key::display_name(&obj.key).to_string(),
                mime_class: MimeClass::classify(obj.content_type.as_deref(), &obj.key),
                size: obj.size,
                last_modified: obj.last_modified,
                key: obj.key,
            })
            .collect();

        // Stable sorts: equal names keep the store's key order.
        folders.sort_by_cached_key(|folder| folder.display_name.to_lowercase());
        files.sort_by_cached_key(|file| file.display_name.to_lowercase());

        debug!(
            "listed {:?}: {} folders, {} files",
            prefix,
            folders.len(),
            files.len()
        );
        Ok(Listing {
            prefix,
            folders,
            files,
        })
    }
}
