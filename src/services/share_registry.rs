//! Time-limited share grants, held in process memory.
//!
//! Expiry is lazy: `lookup` and `list` skip expired records without removing
//! them. Memory is reclaimed only by [`ShareRegistry::sweep_expired`], which
//! the server runs on an interval. Records do not survive a restart and are
//! not visible to other instances.

use crate::{
    models::{
        key,
        share::{ShareMetadata, ShareRecord, ShareRecordSummary},
    },
    services::{
        folder_error::{FolderError, FolderResult},
        object_store::ObjectStore,
    },
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Longest share lifetime, matching the presigned URL ceiling.
pub const MAX_SHARE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Default)]
struct ShareTable {
    records: HashMap<String, ShareRecord>,
    /// `(expires_at, token)` in expiry order, for sweeping.
    by_expiry: BTreeSet<(DateTime<Utc>, String)>,
}

pub struct ShareRegistry {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    table: RwLock<ShareTable>,
}

impl ShareRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            table: RwLock::new(ShareTable::default()),
        }
    }

    /// Issue a new share for an existing object. Sharing the same key again
    /// creates another independent record.
    pub async fn create(&self, object_key: &str, ttl_secs: u64) -> FolderResult<ShareRecord> {
        key::validate_key(object_key).map_err(|v| FolderError::invalid_key(object_key, v))?;
        if key::is_folder(object_key) {
            return Err(FolderError::validation(format!(
                "`{object_key}` is a folder; only files can be shared"
            )));
        }
        if !(1..=MAX_SHARE_TTL_SECS).contains(&ttl_secs) {
            return Err(FolderError::validation(format!(
                "ttl must be between 1 and {MAX_SHARE_TTL_SECS} seconds"
            )));
        }

        let location = self.store.location();
        let exists = self
            .store
            .head(object_key)
            .await
            .map_err(|err| FolderError::upstream("share.create", object_key, &location, err))?;
        if exists.is_none() {
            return Err(FolderError::NotFound(object_key.to_string()));
        }

        let issued_url = self
            .store
            .presign_get(object_key, Duration::from_secs(ttl_secs))
            .await
            .map_err(|err| FolderError::upstream("share.create", object_key, &location, err))?;

        let created_at = self.clock.now();
        let record = ShareRecord {
            token: new_token(),
            key: object_key.to_string(),
            issued_url,
            created_at,
            expires_at: created_at + chrono::Duration::seconds(ttl_secs as i64),
            metadata: None,
        };

        let mut table = self.table.write();
        table
            .by_expiry
            .insert((record.expires_at, record.token.clone()));
        table.records.insert(record.token.clone(), record.clone());
        info!("shared {} until {}", record.key, record.expires_at);
        Ok(record)
    }

    /// Issue a fresh share for `key`. Earlier tokens stay valid until they expire.
    pub async fn regenerate(&self, object_key: &str, ttl_secs: u64) -> FolderResult<ShareRecord> {
        self.create(object_key, ttl_secs).await
    }

    /// The live record for `token`, with current object metadata.
    pub async fn lookup(&self, token: &str) -> FolderResult<ShareRecord> {
        let now = self.clock.now();
        let record = self
            .table
            .read()
            .records
            .get(token)
            .filter(|record| !record.is_expired_at(now))
            .cloned()
            .ok_or_else(|| FolderError::NotFound("share".to_string()))?;

        let location = self.store.location();
        let meta = self
            .store
            .head(&record.key)
            .await
            .map_err(|err| FolderError::upstream("share.lookup", &record.key, &location, err))?
            .ok_or_else(|| FolderError::NotFound(record.key.clone()))?;

        Ok(ShareRecord {
            metadata: Some(ShareMetadata {
                content_type: meta.content_type,
                size: meta.size,
                last_modified: meta.last_modified,
            }),
            ..record
        })
    }

    /// Live shares, newest first.
    pub fn list(&self) -> Vec<ShareRecordSummary> {
        let now = self.clock.now();
        let mut summaries: Vec<_> = self
            .table
            .read()
            .records
            .values()
            .filter(|record| !record.is_expired_at(now))
            .map(|record| ShareRecordSummary::from_record(record, now))
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Drop expired records. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table.write();
        let mut removed = 0;
        while let Some((expires_at, token)) = table.by_expiry.first().cloned() {
            if expires_at > now {
                break;
            }
            table.by_expiry.pop_first();
            table.records.remove(&token);
            removed += 1;
        }
        if removed > 0 {
            debug!("swept {} expired shares", removed);
        }
        removed
    }

    /// Records held, expired ones included.
    pub fn len(&self) -> usize {
        self.table.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 128 random bits, URL-safe.
fn new_token() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryStore;
    use bytes::Bytes;
    use parking_lot::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            let mut now = self.0.lock();
            *now = *now + chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    async fn registry() -> (Arc<ManualClock>, ShareRegistry) {
        let store = Arc::new(MemoryStore::default());
        store
            .put("docs/a.pdf", Bytes::from_static(b"%PDF-1.7"), Some("application/pdf".into()))
            .await
            .unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let registry = ShareRegistry::with_clock(store, clock.clone());
        (clock, registry)
    }

    #[tokio::test]
    async fn tokens_are_unique_per_issue() {
        let (_, registry) = registry().await;
        let first = registry.create("docs/a.pdf", 60).await.unwrap();
        let second = registry.regenerate("docs/a.pdf", 60).await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(first.token.len(), 22);
        assert!(registry.lookup(&first.token).await.is_ok());
        assert!(registry.lookup(&second.token).await.is_ok());
        assert_eq!(registry.list().len(), 2);
    }

    #[tokio::test]
    async fn expiry_is_lazy_until_swept() {
        let (clock, registry) = registry().await;
        let short = registry.create("docs/a.pdf", 10).await.unwrap();
        let long = registry.create("docs/a.pdf", 100).await.unwrap();

        clock.advance(10);
        assert!(matches!(
            registry.lookup(&short.token).await,
            Err(FolderError::NotFound(_))
        ));
        let live: Vec<_> = registry.list().into_iter().map(|s| s.token).collect();
        assert_eq!(live, vec![long.token.clone()]);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.sweep_expired(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&long.token).await.is_ok());
    }

    #[tokio::test]
    async fn lookup_refreshes_metadata() {
        let (_, registry) = registry().await;
        let share = registry.create("docs/a.pdf", 60).await.unwrap();
        assert!(share.metadata.is_none());
        let found = registry.lookup(&share.token).await.unwrap();
        let meta = found.metadata.unwrap();
        assert_eq!(meta.size, 8);
        assert_eq!(meta.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (_, registry) = registry().await;
        assert!(matches!(
            registry.create("docs/missing.pdf", 60).await,
            Err(FolderError::NotFound(_))
        ));
        assert!(matches!(
            registry.create("docs/a.pdf", 0).await,
            Err(FolderError::Validation(_))
        ));
        assert!(matches!(
            registry.create("docs/a.pdf", MAX_SHARE_TTL_SECS + 1).await,
            Err(FolderError::Validation(_))
        ));
        assert!(matches!(
            registry.create("docs/", 60).await,
            Err(FolderError::Validation(_))
        ));
        assert!(registry.is_empty());
    }
}
