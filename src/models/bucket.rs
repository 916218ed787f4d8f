//! The single bucket a store instance serves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A storage bucket: the flat key namespace folders are emulated on.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    pub id: Uuid,

    /// Bucket name (DNS-style naming rules).
    pub name: String,

    /// Region label reported in upstream error context.
    pub region: String,

    pub created_at: DateTime<Utc>,
}
