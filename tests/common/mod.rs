//! Shared fixtures for the folder-store integration tests
//!
//! - folder services over the failure-injecting in-memory store
//! - a manually advanced clock for share expiry
//! - an on-disk store backed by a temp dir and in-memory SQLite

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use folder_store::services::{
    folder_service::{FolderService, FolderSettings},
    memory_store::MemoryStore,
    object_store::ObjectStore,
    share_registry::{Clock, ShareRegistry},
    storage_service::{self, PresignSettings, StorageService},
};

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.0.lock();
        *now = *now + chrono::Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// Payload used for `key` by [`seed`]; distinct per key.
pub fn payload_of(key: &str) -> Bytes {
    Bytes::from(format!("payload of {key}"))
}

/// Put every key into the store. Keys ending in `/` become empty markers.
pub async fn seed(store: &MemoryStore, keys: &[&str]) {
    for key in keys {
        let data = if key.ends_with('/') {
            Bytes::new()
        } else {
            payload_of(key)
        };
        store.put(key, data, None).await.unwrap();
    }
}

/// Folder service with default settings over a seeded memory store.
pub async fn memory_service(keys: &[&str]) -> (Arc<MemoryStore>, FolderService) {
    memory_service_with(keys, FolderSettings::default()).await
}

pub async fn memory_service_with(
    keys: &[&str],
    settings: FolderSettings,
) -> (Arc<MemoryStore>, FolderService) {
    let store = Arc::new(MemoryStore::default());
    seed(&store, keys).await;
    let service = FolderService::new(store.clone(), settings);
    (store, service)
}

/// Folder service whose share registry reads time from a manual clock.
pub async fn memory_service_with_clock(
    keys: &[&str],
) -> (Arc<MemoryStore>, Arc<ManualClock>, FolderService) {
    let store = Arc::new(MemoryStore::default());
    seed(&store, keys).await;
    let clock = ManualClock::new();
    let shares = Arc::new(ShareRegistry::with_clock(store.clone(), clock.clone()));
    let service = FolderService::with_registry(store.clone(), FolderSettings::default(), shares);
    (store, clock, service)
}

/// Disk-backed store in a temp dir. Keep the `TempDir` alive for the test.
pub async fn disk_store() -> (TempDir, StorageService) {
    let dir = tempfile::tempdir().unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    storage_service::run_migrations(&pool).await.unwrap();
    let store = StorageService::open(
        Arc::new(pool),
        dir.path(),
        "integration",
        "local",
        PresignSettings {
            public_base_url: "http://localhost:3000".into(),
            secret: "integration-secret".into(),
        },
    )
    .await
    .unwrap();
    (dir, store)
}

/// `prefix` followed by `count` zero-padded leaf names.
pub fn numbered_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i:03}")).collect()
}
