//! src/services/storage_service.rs
//!
//! StorageService — the default backing store. Durable metadata lives in
//! SQLite, payloads on local disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{md5(bucket/key)}`. Hashing the whole key
//! keeps folder markers (`a/`) and keys that prefix other keys (`a` and `a/b`)
//! from colliding on the filesystem.

use crate::{
    models::{bucket::Bucket, key, object::Object},
    services::object_store::{
        ListPage, ListRequest, MAX_LIST_KEYS, ObjectMeta, ObjectStore, StoreError, StoreLocation,
        StoreResult, common_prefix,
    },
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream};
use md5::Context;
use sha2::{Digest, Sha256};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const SUPPORTED_REGIONS: [&str; 16] = [
    "local",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-northeast-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-2",
    "ap-northeast-3",
    "me-south-1",
];

const OBJECT_COLUMNS: &str = "id, bucket_id, key, filename, content_type, size_bytes, etag, \
                              last_modified, is_deleted";

/// Schema applied by `--migrate` and by tests.
pub const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Settings for presigned URLs issued by the local store.
#[derive(Clone, Debug)]
pub struct PresignSettings {
    /// Externally reachable base, e.g. `http://localhost:3000`.
    pub public_base_url: String,
    /// Key for URL signatures.
    pub secret: String,
}

/// SQLite + disk object store serving exactly one bucket.
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    bucket: Bucket,
    presign: PresignSettings,
}

/// Run the embedded migration statement by statement.
pub async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());
    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}

impl StorageService {
    /// Open the store for `bucket_name`, creating the bucket row and its
    /// directory on first use.
    pub async fn open(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        bucket_name: &str,
        region: &str,
        presign: PresignSettings,
    ) -> StoreResult<Self> {
        let base_path = base_path.into();
        ensure_bucket_name_safe(bucket_name)?;
        let region = region.to_lowercase();
        ensure_region_valid(&region)?;

        let bucket = match fetch_bucket(&db, bucket_name).await {
            Ok(bucket) => bucket,
            Err(StoreError::BucketNotFound(_)) => create_bucket(&db, bucket_name, &region).await?,
            Err(err) => return Err(err),
        };
        if bucket.region != region {
            debug!(
                "bucket {} already registered in region {}, ignoring {}",
                bucket.name, bucket.region, region
            );
        }

        let service = Self {
            db,
            base_path,
            bucket,
            presign,
        };
        fs::create_dir_all(service.bucket_root()).await?;
        Ok(service)
    }

    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        key::validate_key(key).map_err(|violation| StoreError::InvalidObjectKey(violation.to_string()))
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket.name)
    }

    /// Physical payload path: `base/bucket/aa/bb/<md5 hex>`.
    fn object_path(&self, key: &str) -> PathBuf {
        let digest = md5::compute(format!("{}/{}", self.bucket.name, key));
        let mut path = self.bucket_root();
        path.push(format!("{:02x}", digest[0]));
        path.push(format!("{:02x}", digest[1]));
        path.push(format!("{:x}", digest));
        path
    }

    fn not_found(&self, key: &str) -> StoreError {
        StoreError::ObjectNotFound {
            bucket: self.bucket.name.clone(),
            key: key.to_string(),
        }
    }

    /// Fetch a live (non-deleted) object row.
    async fn fetch_object(&self, key: &str) -> StoreResult<Object> {
        self.fetch_object_opt(key)
            .await?
            .ok_or_else(|| self.not_found(key))
    }

    async fn fetch_object_opt(&self, key: &str) -> StoreResult<Option<Object>> {
        let object = sqlx::query_as::<_, Object>(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0"
        ))
        .bind(key)
        .bind(self.bucket.id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(object)
    }

    /// Insert or revive the metadata row for `key` (S3-like overwrite semantics).
    async fn upsert_object(
        &self,
        key: &str,
        content_type: Option<String>,
        size_bytes: i64,
        etag: &str,
    ) -> StoreResult<Object> {
        let filename = key::basename(key).to_string();
        let object = sqlx::query_as::<_, Object>(&format!(
            r#"
            INSERT INTO objects (
                id, bucket_id, key, filename, content_type, size_bytes,
                etag, last_modified, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(bucket_id, key) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                is_deleted = 0
            RETURNING {OBJECT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(self.bucket.id)
        .bind(key)
        .bind(&filename)
        .bind(content_type)
        .bind(size_bytes)
        .bind(etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(object)
    }

    /// Stream-upload an object to disk and update metadata.
    ///
    /// Bytes go to a temporary file (MD5 and size computed on the way),
    /// are fsynced, then renamed into place before the metadata upsert.
    pub async fn upload_object_stream<S>(
        &self,
        key: &str,
        content_type: Option<String>,
        stream: S,
    ) -> StoreResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let tmp_path = self.temp_path_for(&file_path).await?;
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let written = match chunk_res {
                Ok(chunk) => {
                    size_bytes += chunk.len() as i64;
                    digest.consume(&chunk);
                    file.write_all(&chunk).await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = finish_file(&mut file).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        self.commit_payload(&tmp_path, &file_path).await?;

        let etag = format!("{:x}", digest.compute());
        match self
            .upsert_object(key, content_type, size_bytes, &etag)
            .await
        {
            Ok(obj) => Ok(obj),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(err)
            }
        }
    }

    /// Fetch an object for reading: metadata plus an open payload handle.
    pub async fn get_object_reader(&self, key: &str) -> StoreResult<(Object, File)> {
        self.ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;
        let file = File::open(self.object_path(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                self.not_found(key)
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok((object, file))
    }

    /// Fetch only object metadata.
    pub async fn get_object_metadata(&self, key: &str) -> StoreResult<Object> {
        self.ensure_key_safe(key)?;
        self.fetch_object(key).await
    }

    /// Check a presigned URL issued by [`ObjectStore::presign_get`] and
    /// return the key it grants.
    pub fn verify_presigned(
        &self,
        encoded_key: &str,
        expires: i64,
        signature: &str,
    ) -> StoreResult<String> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded_key)
            .map_err(|_| StoreError::InvalidSignature("malformed key"))?;
        let key = String::from_utf8(raw).map_err(|_| StoreError::InvalidSignature("malformed key"))?;
        if expires <= Utc::now().timestamp() {
            return Err(StoreError::InvalidSignature("url expired"));
        }
        if !constant_time_eq(self.sign(&key, expires).as_bytes(), signature.as_bytes()) {
            return Err(StoreError::InvalidSignature("signature mismatch"));
        }
        Ok(key)
    }

    /// `sha256(secret, bucket, key, expires)` with NUL-separated fields.
    /// Not an HMAC; the separators keep field boundaries unambiguous.
    fn sign(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.presign.secret.as_bytes(),
            self.bucket.name.as_bytes(),
            key.as_bytes(),
            expires.to_string().as_bytes(),
        ] {
            hasher.update(part);
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Live rows under `prefix` with keys strictly greater than `after`, in key order.
    async fn fetch_rows_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Object>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket_id = "
        ));
        builder.push_bind(self.bucket.id);
        builder.push(" AND is_deleted = 0");

        if !prefix.is_empty() {
            // substr keeps `%` and `_` in keys literal, unlike LIKE.
            builder.push(" AND substr(key, 1, ");
            builder.push_bind(prefix.chars().count() as i64);
            builder.push(") = ");
            builder.push_bind(prefix.to_string());
        }
        if let Some(after) = after {
            builder.push(" AND key > ");
            builder.push_bind(after.to_string());
        }
        builder.push(" ORDER BY key ASC LIMIT ");
        builder.push_bind(limit as i64);

        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    async fn temp_path_for(&self, file_path: &Path) -> StoreResult<PathBuf> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        Ok(parent.join(format!(".tmp-{}", Uuid::new_v4())))
    }

    async fn commit_payload(&self, tmp_path: &Path, file_path: &Path) -> StoreResult<()> {
        if let Err(err) = fs::rename(tmp_path, file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(file_path).await?;
                fs::rename(tmp_path, file_path).await?;
            } else {
                let _ = fs::remove_file(tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        Ok(())
    }

    /// Recursively remove empty shard directories up to the bucket root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.bucket_root();
        let mut current = start.to_path_buf();
        while current.starts_with(&stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    fn location(&self) -> StoreLocation {
        StoreLocation {
            bucket: self.bucket.name.clone(),
            region: self.bucket.region.clone(),
        }
    }

    /// ListObjectsV2 over SQLite. The continuation token is an exclusive
    /// lower bound on keys. Once a common prefix is emitted the next query
    /// seeks past the whole group, so a folder costs one round trip however
    /// many objects it holds.
    async fn list_page(&self, request: ListRequest) -> StoreResult<ListPage> {
        let max_keys = request.max_keys.clamp(1, MAX_LIST_KEYS);
        let mut page = ListPage::default();
        let mut after = request.continuation_token.clone();
        let mut returned = 0usize;

        'fetch: loop {
            let limit = max_keys - returned + 1;
            let rows = self
                .fetch_rows_after(&request.prefix, after.as_deref(), limit)
                .await?;
            let exhausted = rows.len() < limit;

            for obj in rows {
                if returned == max_keys {
                    page.next_continuation_token = after;
                    return Ok(page);
                }
                returned += 1;

                let group = request
                    .delimiter
                    .as_deref()
                    .and_then(|delim| common_prefix(&obj.key, &request.prefix, delim));
                if let Some(group) = group {
                    after = Some(format!("{group}{}", char::MAX));
                    page.common_prefixes.push(group);
                    continue 'fetch;
                }
                after = Some(obj.key.clone());
                page.objects.push(object_meta(obj));
            }

            if exhausted {
                return Ok(page);
            }
        }
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        self.ensure_key_safe(key)?;
        Ok(self.fetch_object_opt(key).await?.map(object_meta))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> StoreResult<ObjectMeta> {
        let body = stream::once(async move { Ok::<_, io::Error>(data) });
        let object = self.upload_object_stream(key, content_type, body).await?;
        Ok(object_meta(object))
    }

    async fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.ensure_key_safe(from)?;
        self.ensure_key_safe(to)?;
        let source = self.fetch_object(from).await?;

        let src_path = self.object_path(from);
        let dst_path = self.object_path(to);
        let tmp_path = self.temp_path_for(&dst_path).await?;
        if let Err(err) = fs::copy(&src_path, &tmp_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(if err.kind() == ErrorKind::NotFound {
                self.not_found(from)
            } else {
                StoreError::Io(err)
            });
        }
        self.commit_payload(&tmp_path, &dst_path).await?;

        self.upsert_object(
            to,
            source.content_type,
            source.size_bytes,
            source.etag.as_deref().unwrap_or_default(),
        )
        .await?;
        debug!("copied {} -> {}", from, to);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let result = sqlx::query(
            "UPDATE objects SET is_deleted = 1 WHERE key = ? AND bucket_id = ? AND is_deleted = 0",
        )
        .bind(key)
        .bind(self.bucket.id)
        .execute(&*self.db)
        .await?;
        if result.rows_affected() == 0 {
            debug!("delete of absent key {}", key);
            return Ok(());
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }
        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        self.ensure_key_safe(key)?;
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!(
            "{}/presigned/{}?expires={}&signature={}",
            self.presign.public_base_url.trim_end_matches('/'),
            URL_SAFE_NO_PAD.encode(key),
            expires,
            self.sign(key, expires)
        ))
    }
}

fn object_meta(obj: Object) -> ObjectMeta {
    ObjectMeta {
        key: obj.key,
        size: obj.size_bytes.max(0) as u64,
        content_type: obj.content_type,
        etag: obj.etag,
        last_modified: obj.last_modified,
    }
}

/// Compare without an early exit on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn finish_file(file: &mut File) -> io::Result<()> {
    file.flush().await?;
    file.sync_all().await
}

async fn fetch_bucket(db: &SqlitePool, name: &str) -> StoreResult<Bucket> {
    sqlx::query_as::<_, Bucket>("SELECT id, name, region, created_at FROM buckets WHERE name = ?")
        .bind(name)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
}

async fn create_bucket(db: &SqlitePool, name: &str, region: &str) -> StoreResult<Bucket> {
    let bucket = Bucket {
        id: Uuid::new_v4(),
        name: name.to_string(),
        region: region.to_string(),
        created_at: Utc::now(),
    };
    sqlx::query("INSERT INTO buckets (id, name, region, created_at) VALUES (?, ?, ?, ?)")
        .bind(bucket.id)
        .bind(&bucket.name)
        .bind(&bucket.region)
        .bind(bucket.created_at)
        .execute(db)
        .await?;
    tracing::info!("Created bucket {} in {}", bucket.name, bucket.region);
    Ok(bucket)
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn ensure_bucket_name_safe(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.into(),
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }
    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }
    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }
    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }
    Ok(())
}

fn ensure_region_valid(region: &str) -> StoreResult<()> {
    if SUPPORTED_REGIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(region))
    {
        Ok(())
    } else {
        Err(StoreError::UnsupportedRegion(region.to_string()))
    }
}

/// Rejects names formatted like `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, StorageService) {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let store = StorageService::open(
            Arc::new(pool),
            dir.path(),
            "test-bucket",
            "local",
            PresignSettings {
                public_base_url: "http://localhost:3000/".into(),
                secret: "s3cret".into(),
            },
        )
        .await
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn marker_and_nested_keys_coexist_on_disk() {
        let (_dir, store) = open_store().await;
        store.put("a", Bytes::from_static(b"file a"), None).await.unwrap();
        store.put("a/", Bytes::new(), None).await.unwrap();
        store.put("a/b", Bytes::from_static(b"nested"), None).await.unwrap();

        let meta = store.head("a/").await.unwrap().unwrap();
        assert_eq!(meta.size, 0);
        let meta = store.head("a/b").await.unwrap().unwrap();
        assert_eq!(meta.size, 6);
    }

    #[tokio::test]
    async fn copy_then_delete_moves_payload() {
        let (_dir, store) = open_store().await;
        store
            .put("docs/report.pdf", Bytes::from_static(b"%PDF"), Some("application/pdf".into()))
            .await
            .unwrap();

        store.copy("docs/report.pdf", "archive/report.pdf").await.unwrap();
        store.delete("docs/report.pdf").await.unwrap();

        assert!(store.head("docs/report.pdf").await.unwrap().is_none());
        let moved = store.head("archive/report.pdf").await.unwrap().unwrap();
        assert_eq!(moved.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(moved.size, 4);

        let (_, mut file) = store.get_object_reader("archive/report.pdf").await.unwrap();
        let mut body = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut body).await.unwrap();
        assert_eq!(body, b"%PDF");
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let (_dir, store) = open_store().await;
        let err = store.copy("ghost", "elsewhere").await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn delimited_listing_treats_wildcards_literally() {
        let (_dir, store) = open_store().await;
        for key in ["a_b/1", "axb/2", "a_b/sub/3", "a_b/"] {
            store.put(key, Bytes::from_static(b"."), None).await.unwrap();
        }
        let scan = store.scan("a_b/", Some("/"), 1).await.unwrap();
        let keys: Vec<_> = scan.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a_b/", "a_b/1"]);
        assert_eq!(scan.common_prefixes, vec!["a_b/sub/"]);
    }

    #[tokio::test]
    async fn grouped_folder_is_skipped_in_one_page() {
        let (_dir, store) = open_store().await;
        for i in 0..250 {
            store
                .put(&format!("big/{i:03}"), Bytes::from_static(b"."), None)
                .await
                .unwrap();
        }
        store.put("top.txt", Bytes::from_static(b"."), None).await.unwrap();

        let page = store
            .list_page(ListRequest {
                prefix: String::new(),
                delimiter: Some("/".into()),
                continuation_token: None,
                max_keys: 10,
            })
            .await
            .unwrap();

        assert_eq!(page.common_prefixes, vec!["big/"]);
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["top.txt"]);
        assert!(page.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn groups_paginate_one_per_key() {
        let (_dir, store) = open_store().await;
        for key in ["a/1", "a/2", "b/1", "c.txt"] {
            store.put(key, Bytes::from_static(b"."), None).await.unwrap();
        }

        let mut token = None;
        let mut seen = Vec::new();
        loop {
            let page = store
                .list_page(ListRequest {
                    prefix: String::new(),
                    delimiter: Some("/".into()),
                    continuation_token: token.clone(),
                    max_keys: 1,
                })
                .await
                .unwrap();
            assert_eq!(page.common_prefixes.len() + page.objects.len(), 1);
            seen.extend(page.common_prefixes);
            seen.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a/", "b/", "c.txt"]);
    }

    #[test]
    fn signature_comparison_needs_exact_match() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
        assert!(!constant_time_eq(b"abc123", b"abc124"));
        assert!(!constant_time_eq(b"abc123", b"abc12"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = open_store().await;
        store.put("x", Bytes::from_static(b"1"), None).await.unwrap();
        store.delete("x").await.unwrap();
        store.delete("x").await.unwrap();
        assert!(store.head("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn presigned_url_round_trips_through_verification() {
        let (_dir, store) = open_store().await;
        let url = store
            .presign_get("photos/cat.png", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/presigned/"));

        let (path, query) = url.split_once('?').unwrap();
        let encoded = path.rsplit('/').next().unwrap();
        let mut expires = 0;
        let mut signature = "";
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => signature = v,
                _ => {}
            }
        }
        assert_eq!(
            store.verify_presigned(encoded, expires, signature).unwrap(),
            "photos/cat.png"
        );
        assert!(matches!(
            store.verify_presigned(encoded, expires, "bogus"),
            Err(StoreError::InvalidSignature(_))
        ));
        assert!(matches!(
            store.verify_presigned(encoded, Utc::now().timestamp() - 1, signature),
            Err(StoreError::InvalidSignature(_))
        ));
    }

    #[test]
    fn bucket_names_follow_dns_rules() {
        assert!(ensure_bucket_name_safe("folders").is_ok());
        assert!(ensure_bucket_name_safe("ab").is_err());
        assert!(ensure_bucket_name_safe("Upper").is_err());
        assert!(ensure_bucket_name_safe("-edge").is_err());
        assert!(ensure_bucket_name_safe("192.168.0.1").is_err());
    }
}
