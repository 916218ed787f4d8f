//! Flat object-store interface the folder layer is built on.
//!
//! The store knows nothing about folders: it offers prefix scans with optional
//! delimiter grouping, whole-object copy and delete, and presigned reads.
//! Every hierarchical operation is composed from these primitives.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{io, time::Duration};
use thiserror::Error;

/// Largest page a single scan call may return.
pub const MAX_LIST_KEYS: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("region `{0}` is not supported")]
    UnsupportedRegion(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),
    #[error("presigned url rejected: {0}")]
    InvalidSignature(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bucket and region a store serves, used to give failures context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreLocation {
    pub bucket: String,
    pub region: String,
}

/// Metadata for one stored object as returned by scans and `head`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// One ListObjectsV2-style request.
#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    pub prefix: String,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: usize,
}

/// One page of results. Keys are in ascending byte order.
#[derive(Clone, Debug, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectMeta>,
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
}

/// Everything under a prefix after all pages were consumed.
#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    pub objects: Vec<ObjectMeta>,
    /// De-duplicated, in first-seen order.
    pub common_prefixes: Vec<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    fn location(&self) -> StoreLocation;

    async fn list_page(&self, request: ListRequest) -> StoreResult<ListPage>;

    /// Metadata for `key`, or `None` when absent.
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>>;

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> StoreResult<ObjectMeta>;

    /// Server-side copy. Overwrites `to`; fails with `ObjectNotFound` if `from` is absent.
    async fn copy(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Idempotent: deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// A URL granting read access to `key` until `ttl` elapses.
    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String>;

    /// Follow continuation tokens until the prefix is exhausted.
    async fn scan(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        page_size: usize,
    ) -> StoreResult<ScanResult> {
        let mut result = ScanResult::default();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .list_page(ListRequest {
                    prefix: prefix.to_string(),
                    delimiter: delimiter.map(str::to_string),
                    continuation_token: token.clone(),
                    max_keys: page_size.clamp(1, MAX_LIST_KEYS),
                })
                .await?;

            result.objects.extend(page.objects);
            for common in page.common_prefixes {
                if !result.common_prefixes.contains(&common) {
                    result.common_prefixes.push(common);
                }
            }

            match page.next_continuation_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(StoreError::Unavailable(format!(
                        "listing of `{prefix}` repeated continuation token"
                    )));
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(result)
    }
}

/// Compute the grouped "common prefix" of `key` relative to `prefix`.
///
/// Returns `Some` when the remainder of the key contains the delimiter.
pub fn common_prefix(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?;
    let pos = rest.find(delimiter)?;
    Some(format!("{}{}", prefix, &rest[..pos + delimiter.len()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_groups_one_level() {
        assert_eq!(
            common_prefix("a/b/c.txt", "a/", "/").as_deref(),
            Some("a/b/")
        );
        assert_eq!(common_prefix("a/c.txt", "a/", "/"), None);
        assert_eq!(common_prefix("a/", "", "/").as_deref(), Some("a/"));
        assert_eq!(common_prefix("b/x", "a/", "/"), None);
    }
}
