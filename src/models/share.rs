//! Time-limited share grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issued share. Owned by the share registry; never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    /// Unguessable identifier handed to the recipient.
    pub token: String,

    /// Object key the share grants access to.
    pub key: String,

    /// Store-issued URL valid until `expires_at`.
    pub issued_url: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Live object metadata, filled in by lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ShareMetadata>,
}

impl ShareRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Object metadata refreshed from the store when a share is looked up.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareMetadata {
    pub content_type: Option<String>,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Listing view of a live share.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecordSummary {
    pub token: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
}

impl ShareRecordSummary {
    pub fn from_record(record: &ShareRecord, now: DateTime<Utc>) -> Self {
        Self {
            token: record.token.clone(),
            key: record.key.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            remaining_seconds: (record.expires_at - now).num_seconds().max(0),
        }
    }
}
