//! Error taxonomy of the folder layer.
//!
//! Each operation returns either its typed success report or one of these.
//! Partial failures carry the journal of what already happened, because no
//! operation rolls back.

use crate::{
    models::key::KeyViolation,
    services::object_store::{StoreError, StoreLocation},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolderError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("`{0}` not found")]
    NotFound(String),

    #[error("{} partially failed: {} done, {} failed, {} pending", .0.operation, .0.completed.len(), .0.failed.len(), .0.pending.len())]
    PartialFailure(Box<PartialFailure>),

    #[error("{operation} on `{key}` failed (bucket `{bucket}`, region `{region}`): {source}")]
    Upstream {
        operation: &'static str,
        key: String,
        bucket: String,
        region: String,
        #[source]
        source: StoreError,
    },
}

pub type FolderResult<T> = Result<T, FolderError>;

impl FolderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FolderError::Validation(msg.into())
    }

    /// Wrap a store failure with the operation and key that caused it.
    /// A missing object maps to `NotFound` rather than an upstream fault.
    pub fn upstream(
        operation: &'static str,
        key: impl Into<String>,
        location: &StoreLocation,
        source: StoreError,
    ) -> Self {
        let key = key.into();
        match source {
            StoreError::ObjectNotFound { .. } => FolderError::NotFound(key),
            StoreError::InvalidObjectKey(reason) => FolderError::Validation(reason),
            source => FolderError::Upstream {
                operation,
                key,
                bucket: location.bucket.clone(),
                region: location.region.clone(),
                source,
            },
        }
    }

    pub fn invalid_key(key: &str, violation: KeyViolation) -> Self {
        FolderError::Validation(format!("`{key}`: {violation}"))
    }
}

/// A key handled before the operation stopped. `destination` is set for
/// moves and absent for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedObject {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// A key whose sub-operation failed. It still exists at `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedObject {
    pub key: String,
    pub message: String,
}

/// Journal of a recursive operation that stopped midway.
///
/// For renames, `completed` now exist only at their new keys, `failed` and
/// `pending` only at their old keys. For deletes, `completed` are gone and
/// `pending` is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailure {
    pub operation: String,
    pub completed: Vec<CompletedObject>,
    pub failed: Vec<FailedObject>,
    pub pending: Vec<String>,
}
