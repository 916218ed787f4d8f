//! Data types shared by the folder layer, the backing stores and the HTTP surface.
//!
//! Row types (`Bucket`, `Object`) map to SQLite via `sqlx::FromRow`; the rest
//! serialize as camelCase JSON via `serde`.

pub mod batch;
pub mod bucket;
pub mod entry;
pub mod key;
pub mod object;
pub mod share;
