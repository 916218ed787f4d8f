//! In-memory [`ObjectStore`] with failure injection.
//!
//! Keys live in a `BTreeMap`, so scans return byte order like a real store.
//! Failure rules make individual copy/delete calls fail on chosen keys, which
//! is how partial-failure behaviour of the folder layer is exercised.

use crate::services::object_store::{
    ListPage, ListRequest, MAX_LIST_KEYS, ObjectMeta, ObjectStore, StoreError, StoreLocation,
    StoreResult, common_prefix,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::{collections::BTreeMap, ops::Bound, time::Duration};

/// Store primitive a failure rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailOp {
    List,
    Head,
    Put,
    Copy,
    Delete,
    Presign,
}

#[derive(Clone, Debug)]
struct FailRule {
    op: FailOp,
    /// `None` matches every key.
    key: Option<String>,
}

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    etag: String,
    last_modified: DateTime<Utc>,
}

pub struct MemoryStore {
    location: StoreLocation,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    rules: Mutex<Vec<FailRule>>,
    calls: Mutex<Vec<(FailOp, String)>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory", "local")
    }
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            location: StoreLocation {
                bucket: bucket.into(),
                region: region.into(),
            },
            objects: RwLock::new(BTreeMap::new()),
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every `op` call that touches `key` fail. For copies both the
    /// source and the destination are matched.
    pub fn fail_on(&self, op: FailOp, key: impl Into<String>) {
        self.rules.lock().push(FailRule {
            op,
            key: Some(key.into()),
        });
    }

    /// Make every `op` call fail.
    pub fn fail_all(&self, op: FailOp) {
        self.rules.lock().push(FailRule { op, key: None });
    }

    pub fn clear_failures(&self) {
        self.rules.lock().clear();
    }

    /// Keys passed to `op`, in call order.
    pub fn calls(&self, op: FailOp) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| *called == op)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Number of mutating calls (put, copy, delete) seen so far.
    pub fn mutation_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(op, _)| matches!(op, FailOp::Put | FailOp::Copy | FailOp::Delete))
            .count()
    }

    /// Raw payload of `key`, bypassing failure rules.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|obj| obj.data.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// All keys beginning with `prefix`, in order, bypassing failure rules.
    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn check(&self, op: FailOp, keys: &[&str]) -> StoreResult<()> {
        {
            let mut calls = self.calls.lock();
            for key in keys {
                calls.push((op, key.to_string()));
            }
        }
        let rules = self.rules.lock();
        let hit = rules.iter().any(|rule| {
            rule.op == op
                && rule
                    .key
                    .as_deref()
                    .is_none_or(|target| keys.contains(&target))
        });
        if hit {
            return Err(StoreError::Unavailable(format!(
                "injected {op:?} failure on `{}`",
                keys.join("` -> `")
            )));
        }
        Ok(())
    }

    fn meta(key: &str, obj: &StoredObject) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size: obj.data.len() as u64,
            content_type: obj.content_type.clone(),
            etag: Some(obj.etag.clone()),
            last_modified: obj.last_modified,
        }
    }

    fn not_found(&self, key: &str) -> StoreError {
        StoreError::ObjectNotFound {
            bucket: self.location.bucket.clone(),
            key: key.to_string(),
        }
    }
}

/// Continuation tokens mark either the last object (`k:`) or the last common
/// prefix (`p:`) returned, so a resumed scan can skip a whole group.
enum Resume {
    AfterKey(String),
    AfterPrefix(String),
}

impl Resume {
    fn parse(token: &str) -> StoreResult<Self> {
        if let Some(key) = token.strip_prefix("k:") {
            Ok(Resume::AfterKey(key.to_string()))
        } else if let Some(prefix) = token.strip_prefix("p:") {
            Ok(Resume::AfterPrefix(prefix.to_string()))
        } else {
            Err(StoreError::Unavailable(format!(
                "malformed continuation token `{token}`"
            )))
        }
    }

    fn skips(&self, key: &str) -> bool {
        match self {
            Resume::AfterKey(last) => key <= last.as_str(),
            Resume::AfterPrefix(group) => key.starts_with(group.as_str()) || key <= group.as_str(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn location(&self) -> StoreLocation {
        self.location.clone()
    }

    async fn list_page(&self, request: ListRequest) -> StoreResult<ListPage> {
        self.check(FailOp::List, &[&request.prefix])?;
        let resume = request
            .continuation_token
            .as_deref()
            .map(Resume::parse)
            .transpose()?;
        let max_keys = request.max_keys.clamp(1, MAX_LIST_KEYS);

        let objects = self.objects.read();
        let range = objects.range::<str, _>((Bound::Included(request.prefix.as_str()), Bound::Unbounded));

        let mut page = ListPage::default();
        let mut last_token = None;
        let mut returned = 0usize;
        for (key, obj) in range {
            if !key.starts_with(&request.prefix) {
                break;
            }
            if resume.as_ref().is_some_and(|r| r.skips(key)) {
                continue;
            }
            let grouped = request
                .delimiter
                .as_deref()
                .and_then(|delim| common_prefix(key, &request.prefix, delim));
            if let Some(group) = &grouped {
                if page.common_prefixes.last() == Some(group) {
                    continue;
                }
            }
            if returned == max_keys {
                page.next_continuation_token = last_token;
                return Ok(page);
            }
            match grouped {
                Some(group) => {
                    last_token = Some(format!("p:{group}"));
                    page.common_prefixes.push(group);
                }
                None => {
                    last_token = Some(format!("k:{key}"));
                    page.objects.push(Self::meta(key, obj));
                }
            }
            returned += 1;
        }
        Ok(page)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        self.check(FailOp::Head, &[key])?;
        Ok(self.objects.read().get(key).map(|obj| Self::meta(key, obj)))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> StoreResult<ObjectMeta> {
        self.check(FailOp::Put, &[key])?;
        let obj = StoredObject {
            etag: format!("{:x}", md5::compute(&data)),
            data,
            content_type,
            last_modified: Utc::now(),
        };
        let meta = Self::meta(key, &obj);
        self.objects.write().insert(key.to_string(), obj);
        Ok(meta)
    }

    async fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.check(FailOp::Copy, &[from, to])?;
        let mut objects = self.objects.write();
        let mut obj = objects.get(from).cloned().ok_or_else(|| self.not_found(from))?;
        obj.last_modified = Utc::now();
        objects.insert(to.to_string(), obj);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(FailOp::Delete, &[key])?;
        self.objects.write().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        self.check(FailOp::Presign, &[key])?;
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!(
            "memory://{}/{}?expires={}",
            self.location.bucket, key, expires
        ))
    }
}
