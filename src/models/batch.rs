//! Outcome of a multi-item drop.

use serde::{Deserialize, Serialize};

/// A source that reached its destination.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub source_key: String,
    pub destination_key: String,
}

/// A source that did not move. It remains at `source_key`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub source_key: String,
    pub message: String,
}

/// Per-item results of one drop. `success` is true iff `errors` is empty;
/// results alongside errors is a genuine partial completion.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub results: Vec<BatchItem>,
    pub errors: Vec<BatchError>,
    pub success: bool,
}

impl BatchResult {
    pub fn from_parts(results: Vec<BatchItem>, errors: Vec<BatchError>) -> Self {
        let success = errors.is_empty();
        Self {
            results,
            errors,
            success,
        }
    }
}
