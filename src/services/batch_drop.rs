//! Multi-item drop: move several keys into one folder, item by item.
//!
//! Each key is moved as a single object, including folder markers; a dropped
//! folder's contents are not expanded. A failing item is recorded and the
//! rest still run, so the result can mix successes and errors.

use crate::{
    models::{
        batch::{BatchError, BatchItem, BatchResult},
        key,
    },
    services::{
        folder_error::{FolderError, FolderResult},
        mutator::Mutator,
    },
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct BatchDropCoordinator {
    mutator: Mutator,
}

impl BatchDropCoordinator {
    pub fn new(mutator: Mutator) -> Self {
        Self { mutator }
    }

    /// Move every source to `destination_path + basename(source)`.
    ///
    /// Only request-level problems (no sources, a destination in the trash)
    /// are returned as errors, and those are raised before any item is touched.
    pub async fn drop_many(
        &self,
        source_keys: &[String],
        destination_path: &str,
    ) -> FolderResult<BatchResult> {
        if source_keys.is_empty() {
            return Err(FolderError::validation("at least one source key is required"));
        }
        let destination = key::normalize_folder(destination_path);
        self.mutator.guard_destination(destination_path)?;
        self.mutator.guard_destination(&destination)?;
        if !destination.is_empty() {
            key::validate_key(&destination)
                .map_err(|v| FolderError::invalid_key(&destination, v))?;
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for source in source_keys {
            match self.drop_one(source, &destination).await {
                Ok(destination_key) => results.push(BatchItem {
                    source_key: source.clone(),
                    destination_key,
                }),
                Err(err) => {
                    warn!("drop of {} into {:?} failed: {}", source, destination, err);
                    errors.push(BatchError {
                        source_key: source.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            "dropped {}/{} items into {:?}",
            results.len(),
            source_keys.len(),
            destination
        );
        Ok(BatchResult::from_parts(results, errors))
    }

    async fn drop_one(&self, source: &str, destination: &str) -> FolderResult<String> {
        key::validate_key(source).map_err(|v| FolderError::invalid_key(source, v))?;
        let destination_key = format!("{}{}", destination, key::basename(source));
        if destination_key == source {
            return Err(FolderError::validation("source and destination are identical"));
        }
        self.mutator
            .move_leaf(source, &destination_key, "drop")
            .await?;
        Ok(destination_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        folder_service::FolderSettings,
        memory_store::{FailOp, MemoryStore},
        object_store::ObjectStore,
    };
    use bytes::Bytes;
    use std::sync::Arc;

    async fn coordinator_with(keys: &[&str]) -> (Arc<MemoryStore>, BatchDropCoordinator) {
        let store = Arc::new(MemoryStore::default());
        for key in keys {
            store.put(key, Bytes::from_static(b"."), None).await.unwrap();
        }
        let mutator = Mutator::new(store.clone(), Arc::new(FolderSettings::default()));
        (store, BatchDropCoordinator::new(mutator))
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn identical_destination_is_an_item_error() {
        let (store, coordinator) = coordinator_with(&["dest/a.txt", "b.txt"]).await;
        let result = coordinator
            .drop_many(&keys(&["dest/a.txt", "b.txt"]), "dest")
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.errors[0].source_key, "dest/a.txt");
        assert_eq!(result.results[0].destination_key, "dest/b.txt");
        assert!(store.contains("dest/a.txt"));
    }

    #[tokio::test]
    async fn folder_source_moves_only_the_marker() {
        let (store, coordinator) = coordinator_with(&["pics/", "pics/1.png"]).await;
        let result = coordinator
            .drop_many(&keys(&["pics/"]), "archive/")
            .await
            .unwrap();
        assert!(result.success);
        assert!(store.contains("archive/pics/"));
        assert!(store.contains("pics/1.png"));
    }

    #[tokio::test]
    async fn request_level_validation() {
        let (store, coordinator) = coordinator_with(&["a"]).await;
        assert!(matches!(
            coordinator.drop_many(&[], "x/").await,
            Err(FolderError::Validation(_))
        ));
        assert!(matches!(
            coordinator.drop_many(&keys(&["a"]), ".trash").await,
            Err(FolderError::Validation(_))
        ));
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn failing_item_does_not_stop_the_batch() {
        let (store, coordinator) = coordinator_with(&["a", "b", "c"]).await;
        store.fail_on(FailOp::Copy, "b");
        let result = coordinator
            .drop_many(&keys(&["a", "b", "c"]), "in")
            .await
            .unwrap();
        assert!(!result.success);
        let moved: Vec<_> = result.results.iter().map(|r| r.destination_key.as_str()).collect();
        assert_eq!(moved, vec!["in/a", "in/c"]);
        assert_eq!(result.errors.len(), 1);
        assert!(store.contains("b"));
    }
}
