//! Row type for one stored object in the SQLite-backed store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one object held by [`StorageService`](crate::services::storage_service::StorageService).
///
/// The payload bytes live on disk; this row only describes them. Folder markers
/// are ordinary rows whose key ends in `/` and whose size is zero.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Object {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent bucket.
    pub bucket_id: Uuid,

    /// Full object key, e.g. `photos/2025/img.jpg`.
    pub key: String,

    /// Last path segment of the key.
    pub filename: String,

    /// Content type (MIME type) supplied at upload time.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 of the payload, hex encoded.
    pub etag: Option<String>,

    /// Timestamp when object was last written (upload or copy target).
    pub last_modified: DateTime<Utc>,

    /// Set once the object has been deleted; the row is revived by a later write.
    pub is_deleted: bool,
}
