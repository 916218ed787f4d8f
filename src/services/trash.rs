//! Soft delete and restore through the reserved trash prefix.
//!
//! An item is trashed under `trash_prefix + basename(key)`. No record of the
//! original location is kept, so the caller supplies it on restore, and two
//! items with the same basename overwrite each other in the trash.

use crate::{
    models::{entry::Listing, key},
    services::{
        folder_error::{FolderError, FolderResult},
        folder_service::FolderSettings,
        listing::Resolver,
        mutator::{DeleteReport, Mutator},
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Where a trashed or restored item went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashReport {
    pub original_key: String,
    pub trash_key: String,
    /// Objects moved; more than one for folders.
    pub moved: usize,
}

#[derive(Clone)]
pub struct TrashManager {
    mutator: Mutator,
    resolver: Resolver,
    settings: Arc<FolderSettings>,
}

impl TrashManager {
    pub fn new(mutator: Mutator, resolver: Resolver, settings: Arc<FolderSettings>) -> Self {
        Self {
            mutator,
            resolver,
            settings,
        }
    }

    /// Trash location for `key`: the trash prefix plus its basename.
    pub fn trash_key_of(&self, key: &str) -> String {
        format!("{}{}", self.settings.trash_prefix, key::basename(key))
    }

    /// Move `key` into the trash. Folder keys take their whole subtree along.
    pub async fn soft_delete(&self, key: &str) -> FolderResult<TrashReport> {
        key::validate_key(key).map_err(|v| FolderError::invalid_key(key, v))?;
        if key::is_trash_path(key, &self.settings.trash_prefix) {
            return Err(FolderError::validation(format!(
                "`{key}` is already in the trash"
            )));
        }

        let trash_key = self.trash_key_of(key);
        let report = self.mutator.relocate(key, &trash_key, "soft_delete").await?;
        info!("trashed {} as {}", key, trash_key);
        Ok(TrashReport {
            original_key: key.to_string(),
            trash_key,
            moved: report.moved,
        })
    }

    /// Move a trashed item back to `original_key`. The original location is
    /// taken on trust; nothing records where the item came from.
    pub async fn restore(&self, trash_key: &str, original_key: &str) -> FolderResult<TrashReport> {
        if trash_key.is_empty() || original_key.is_empty() {
            return Err(FolderError::validation(
                "trash key and original key are required",
            ));
        }
        key::validate_key(trash_key).map_err(|v| FolderError::invalid_key(trash_key, v))?;

        let trash_prefix = &self.settings.trash_prefix;
        if !trash_key.starts_with(trash_prefix.as_str()) || trash_key == trash_prefix {
            return Err(FolderError::validation(format!(
                "`{trash_key}` is not an item inside the trash"
            )));
        }

        let original_key = if key::is_folder(trash_key) {
            key::normalize_folder(original_key)
        } else if key::is_folder(original_key) {
            return Err(FolderError::validation(format!(
                "file `{trash_key}` cannot be restored to folder key `{original_key}`"
            )));
        } else {
            original_key.to_string()
        };
        key::validate_key(&original_key)
            .map_err(|v| FolderError::invalid_key(&original_key, v))?;
        if key::is_trash_path(&original_key, trash_prefix) {
            return Err(FolderError::validation(format!(
                "restore target `{original_key}` is inside the trash"
            )));
        }

        let report = self
            .mutator
            .relocate(trash_key, &original_key, "restore")
            .await?;
        info!("restored {} to {}", trash_key, original_key);
        Ok(TrashReport {
            original_key,
            trash_key: trash_key.to_string(),
            moved: report.moved,
        })
    }

    /// Top level of the trash.
    pub async fn list(&self) -> FolderResult<Listing> {
        self.resolver.list_level(&self.settings.trash_prefix).await
    }

    /// Permanently delete everything in the trash.
    pub async fn empty(&self) -> FolderResult<DeleteReport> {
        self.mutator
            .delete_tree(&self.settings.trash_prefix, true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        memory_store::{FailOp, MemoryStore},
        object_store::ObjectStore,
    };
    use bytes::Bytes;

    async fn trash_with(keys: &[&str]) -> (Arc<MemoryStore>, TrashManager) {
        let store = Arc::new(MemoryStore::default());
        for key in keys {
            store.put(key, Bytes::from(key.to_string()), None).await.unwrap();
        }
        let settings = Arc::new(FolderSettings::default());
        let manager = TrashManager::new(
            Mutator::new(store.clone(), settings.clone()),
            Resolver::new(store.clone(), settings.clone()),
            settings,
        );
        (store, manager)
    }

    #[tokio::test]
    async fn soft_delete_uses_basename() {
        let (store, trash) = trash_with(&["docs/2024/plan.md"]).await;
        let report = trash.soft_delete("docs/2024/plan.md").await.unwrap();
        assert_eq!(report.trash_key, ".trash/plan.md");
        assert!(!store.contains("docs/2024/plan.md"));
        assert!(store.contains(".trash/plan.md"));
    }

    #[tokio::test]
    async fn folder_soft_delete_takes_contents() {
        let (store, trash) = trash_with(&["a/b/", "a/b/1", "a/b/c/2", "a/keep"]).await;
        let report = trash.soft_delete("a/b/").await.unwrap();
        assert_eq!(report.trash_key, ".trash/b/");
        assert_eq!(report.moved, 3);
        assert_eq!(store.keys_under(".trash/"), vec![".trash/b/", ".trash/b/1", ".trash/b/c/2"]);
        assert_eq!(store.keys_under("a/"), vec!["a/keep"]);

        trash.restore(".trash/b", "a/b").await.unwrap_err();
        let restored = trash.restore(".trash/b/", "a/b").await.unwrap();
        assert_eq!(restored.original_key, "a/b/");
        assert_eq!(store.keys_under("a/b/"), vec!["a/b/", "a/b/1", "a/b/c/2"]);
    }

    #[tokio::test]
    async fn same_basename_collides_in_trash() {
        let (store, trash) = trash_with(&["x/notes.txt", "y/notes.txt"]).await;
        trash.soft_delete("x/notes.txt").await.unwrap();
        trash.soft_delete("y/notes.txt").await.unwrap();
        assert_eq!(store.keys_under(".trash/"), vec![".trash/notes.txt"]);
        assert_eq!(store.get(".trash/notes.txt").unwrap(), Bytes::from("y/notes.txt"));
    }

    #[tokio::test]
    async fn restore_guards() {
        let (store, trash) = trash_with(&[".trash/a.txt", "b.txt"]).await;
        assert!(matches!(
            trash.soft_delete(".trash/a.txt").await,
            Err(FolderError::Validation(_))
        ));
        assert!(matches!(
            trash.restore("b.txt", "c.txt").await,
            Err(FolderError::Validation(_))
        ));
        assert!(matches!(
            trash.restore(".trash/a.txt", ".trash/again.txt").await,
            Err(FolderError::Validation(_))
        ));
        // A file never lands on a folder marker.
        assert!(matches!(
            trash.restore(".trash/a.txt", "keep/").await,
            Err(FolderError::Validation(_))
        ));
        assert_eq!(store.mutation_count(), 2);
        assert!(store.contains(".trash/a.txt"));
    }

    #[tokio::test]
    async fn empty_trash_removes_everything_and_tolerates_empty() {
        let (store, trash) = trash_with(&[".trash/a", ".trash/f/", ".trash/f/b", "live"]).await;
        let report = trash.empty().await.unwrap();
        assert_eq!(report.deleted.len(), 3);
        assert!(store.keys_under(".trash/").is_empty());
        assert!(store.contains("live"));
        assert!(trash.empty().await.unwrap().deleted.is_empty());
    }

    #[tokio::test]
    async fn failed_copy_leaves_original_in_place() {
        let (store, trash) = trash_with(&["a.txt"]).await;
        store.fail_all(FailOp::Copy);
        assert!(matches!(
            trash.soft_delete("a.txt").await,
            Err(FolderError::Upstream { .. })
        ));
        assert!(store.contains("a.txt"));
    }
}
