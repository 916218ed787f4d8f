//! Rename, move and delete of single objects and whole subtrees.
//!
//! The store has no rename, so every move is a copy followed by a delete of
//! the source, one descendant at a time in enumeration order. Nothing is
//! rolled back: when descendant `i` of `n` fails, `[0, i)` live only under
//! the new prefix and `[i, n)` only under the old one. The returned
//! [`PartialFailure`] journal says exactly which keys are where.
//!
//! Re-running an interrupted rename is safe: a fresh enumeration only finds
//! what is still under the old prefix, and a descendant whose copy landed but
//! whose delete failed is simply copied again before being deleted.

use crate::{
    models::key::{self, FOLDER_MARKER_CONTENT_TYPE},
    services::{
        folder_error::{CompletedObject, FailedObject, FolderError, FolderResult, PartialFailure},
        folder_service::FolderSettings,
        object_store::{ObjectMeta, ObjectStore},
    },
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Successful rename or move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReport {
    pub old_key: String,
    pub new_key: String,
    /// Objects relocated; 1 for a leaf.
    pub moved: usize,
}

/// Successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub key: String,
    pub deleted: Vec<String>,
}

#[derive(Clone)]
pub struct Mutator {
    store: Arc<dyn ObjectStore>,
    settings: Arc<FolderSettings>,
}

impl Mutator {
    pub fn new(store: Arc<dyn ObjectStore>, settings: Arc<FolderSettings>) -> Self {
        Self { store, settings }
    }

    /// Write a zero-byte marker so an empty folder shows up in listings.
    pub async fn create_folder(&self, path: &str) -> FolderResult<String> {
        let folder = key::normalize_folder(path);
        if folder.is_empty() {
            return Err(FolderError::validation("folder path is required"));
        }
        key::validate_key(&folder).map_err(|v| FolderError::invalid_key(&folder, v))?;
        self.guard_destination(&folder)?;

        let location = self.store.location();
        self.store
            .put(
                &folder,
                Bytes::new(),
                Some(FOLDER_MARKER_CONTENT_TYPE.to_string()),
            )
            .await
            .map_err(|err| FolderError::upstream("create_folder", &folder, &location, err))?;
        info!("created folder marker {}", folder);
        Ok(folder)
    }

    /// Rename a file, or a folder together with everything beneath it.
    ///
    /// Folder keys end in `/`; the destination of a folder rename is
    /// normalised to a folder key.
    pub async fn rename(&self, old_key: &str, new_key: &str) -> FolderResult<RenameReport> {
        let (old_key, new_key) = self.validate_rename(old_key, new_key)?;
        self.guard_destination(&new_key)?;
        self.relocate(&old_key, &new_key, "rename").await
    }

    /// Move `key` into `destination_folder`, keeping its basename.
    pub async fn move_into(
        &self,
        key: &str,
        destination_folder: &str,
    ) -> FolderResult<RenameReport> {
        let folder = key::normalize_folder(destination_folder);
        let new_key = format!("{}{}", folder, key::basename(key));
        self.rename(key, &new_key).await
    }

    /// Delete a file, or a folder and every descendant. Each descendant is
    /// attempted even after an earlier one failed.
    pub async fn delete(&self, key: &str) -> FolderResult<DeleteReport> {
        key::validate_key(key).map_err(|v| FolderError::invalid_key(key, v))?;
        if key::is_folder(key) {
            return self.delete_tree(key, false).await;
        }

        let location = self.store.location();
        let exists = self
            .store
            .head(key)
            .await
            .map_err(|err| FolderError::upstream("delete", key, &location, err))?;
        if exists.is_none() {
            return Err(FolderError::NotFound(key.to_string()));
        }
        self.store
            .delete(key)
            .await
            .map_err(|err| FolderError::upstream("delete", key, &location, err))?;
        info!("deleted {}", key);
        Ok(DeleteReport {
            key: key.to_string(),
            deleted: vec![key.to_string()],
        })
    }

    /// Reject any destination inside the reserved trash prefix.
    pub(crate) fn guard_destination(&self, destination: &str) -> FolderResult<()> {
        if key::is_trash_path(destination, &self.settings.trash_prefix) {
            return Err(FolderError::validation(format!(
                "destination `{destination}` is inside the reserved trash prefix `{}`",
                self.settings.trash_prefix
            )));
        }
        Ok(())
    }

    fn validate_rename(&self, old_key: &str, new_key: &str) -> FolderResult<(String, String)> {
        if old_key.is_empty() || new_key.is_empty() {
            return Err(FolderError::validation("both source and destination are required"));
        }
        key::validate_key(old_key).map_err(|v| FolderError::invalid_key(old_key, v))?;

        let new_key = if key::is_folder(old_key) {
            key::normalize_folder(new_key)
        } else if key::is_folder(new_key) {
            return Err(FolderError::validation(format!(
                "file `{old_key}` cannot be renamed to folder key `{new_key}`"
            )));
        } else {
            new_key.to_string()
        };
        key::validate_key(&new_key).map_err(|v| FolderError::invalid_key(&new_key, v))?;

        if old_key == new_key {
            return Err(FolderError::validation("source and destination are identical"));
        }
        if key::is_folder(old_key) && new_key.starts_with(old_key) {
            return Err(FolderError::validation(format!(
                "folder `{old_key}` cannot be moved into itself (`{new_key}`)"
            )));
        }
        Ok((old_key.to_string(), new_key))
    }

    /// Copy-then-delete `old_key` to `new_key`, recursing for folder keys.
    /// No trash guard: the trash manager moves through here too.
    pub(crate) async fn relocate(
        &self,
        old_key: &str,
        new_key: &str,
        operation: &'static str,
    ) -> FolderResult<RenameReport> {
        if key::is_folder(old_key) {
            return self.relocate_tree(old_key, new_key, operation).await;
        }
        self.move_leaf(old_key, new_key, operation).await?;
        info!("{} {} -> {}", operation, old_key, new_key);
        Ok(RenameReport {
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
            moved: 1,
        })
    }

    /// Copy `from` to `to`, then delete `from`. If the delete fails the object
    /// exists under both keys.
    pub(crate) async fn move_leaf(
        &self,
        from: &str,
        to: &str,
        operation: &'static str,
    ) -> FolderResult<()> {
        let location = self.store.location();
        self.store
            .copy(from, to)
            .await
            .map_err(|err| FolderError::upstream(operation, from, &location, err))?;
        self.store.delete(from).await.map_err(|err| {
            warn!("{}: copied {} to {} but could not delete the source", operation, from, to);
            FolderError::upstream(operation, from, &location, err)
        })?;
        debug!("{}: moved {} -> {}", operation, from, to);
        Ok(())
    }

    async fn enumerate(&self, prefix: &str, operation: &'static str) -> FolderResult<Vec<ObjectMeta>> {
        let location = self.store.location();
        let scan = self
            .store
            .scan(prefix, None, self.settings.page_size)
            .await
            .map_err(|err| FolderError::upstream(operation, prefix, &location, err))?;
        Ok(scan.objects)
    }

    async fn relocate_tree(
        &self,
        old_prefix: &str,
        new_prefix: &str,
        operation: &'static str,
    ) -> FolderResult<RenameReport> {
        let descendants = self.enumerate(old_prefix, operation).await?;
        if descendants.is_empty() {
            return Err(FolderError::NotFound(old_prefix.to_string()));
        }
        let total = descendants.len();

        let mut completed = Vec::with_capacity(total);
        let mut keys = descendants.into_iter().map(|obj| obj.key);
        while let Some(from) = keys.next() {
            let Some(to) = key::rebase(&from, old_prefix, new_prefix) else {
                continue;
            };
            if let Err(err) = self.move_leaf(&from, &to, operation).await {
                if completed.is_empty() {
                    return Err(err);
                }
                warn!(
                    "{} {} -> {} stopped after {}/{} objects: {}",
                    operation,
                    old_prefix,
                    new_prefix,
                    completed.len(),
                    total,
                    err
                );
                return Err(FolderError::PartialFailure(Box::new(PartialFailure {
                    operation: operation.to_string(),
                    completed,
                    failed: vec![FailedObject {
                        key: from,
                        message: err.to_string(),
                    }],
                    pending: keys.collect(),
                })));
            }
            completed.push(CompletedObject {
                key: from,
                destination: Some(to),
            });
        }

        info!(
            "{} {} -> {} ({} objects)",
            operation, old_prefix, new_prefix, total
        );
        Ok(RenameReport {
            old_key: old_prefix.to_string(),
            new_key: new_prefix.to_string(),
            moved: completed.len(),
        })
    }

    /// Delete every object under `prefix`. With `allow_empty` an empty
    /// prefix is a successful no-op instead of `NotFound`.
    pub(crate) async fn delete_tree(
        &self,
        prefix: &str,
        allow_empty: bool,
    ) -> FolderResult<DeleteReport> {
        let descendants = self.enumerate(prefix, "delete").await?;
        if descendants.is_empty() && !allow_empty {
            return Err(FolderError::NotFound(prefix.to_string()));
        }

        let location = self.store.location();
        let mut deleted = Vec::with_capacity(descendants.len());
        let mut failed = Vec::new();
        let mut first_error = None;
        for obj in descendants {
            match self.store.delete(&obj.key).await {
                Ok(()) => {
                    debug!("delete: removed {}", obj.key);
                    deleted.push(obj.key);
                }
                Err(err) => {
                    let err = FolderError::upstream("delete", &obj.key, &location, err);
                    failed.push(FailedObject {
                        key: obj.key,
                        message: err.to_string(),
                    });
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            // A lone failure is reported as itself; several always carry the journal.
            if deleted.is_empty() && failed.len() == 1 {
                return Err(err);
            }
            warn!(
                "delete {} left {} objects behind",
                prefix,
                failed.len()
            );
            return Err(FolderError::PartialFailure(Box::new(PartialFailure {
                operation: "delete".to_string(),
                completed: deleted
                    .into_iter()
                    .map(|key| CompletedObject {
                        key,
                        destination: None,
                    })
                    .collect(),
                failed,
                pending: Vec::new(),
            })));
        }

        info!("deleted {} ({} objects)", prefix, deleted.len());
        Ok(DeleteReport {
            key: prefix.to_string(),
            deleted,
        })
    }
}
