use crate::services::{folder_error::FolderError, object_store::StoreError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

/// HTTP-facing error: a status, a message, and an optional structured payload
/// (the journal of a partial failure).
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<FolderError> for AppError {
    fn from(err: FolderError) -> Self {
        let message = err.to_string();
        match err {
            FolderError::Validation(_) => AppError::bad_request(message),
            FolderError::NotFound(_) => AppError::not_found(message),
            FolderError::PartialFailure(partial) => AppError {
                status: StatusCode::MULTI_STATUS,
                message,
                details: serde_json::to_value(&*partial).ok(),
            },
            FolderError::Upstream {
                operation,
                key,
                bucket,
                region,
                ..
            } => {
                tracing::error!("{}", message);
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    message,
                    details: Some(json!({
                        "operation": operation,
                        "key": key,
                        "bucket": bucket,
                        "region": region,
                    })),
                }
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ObjectNotFound { .. } | StoreError::BucketNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            StoreError::InvalidObjectKey(_) | StoreError::InvalidBucketName { .. } => {
                AppError::bad_request(err.to_string())
            }
            StoreError::InvalidSignature(_) => AppError::new(StatusCode::FORBIDDEN, err.to_string()),
            other => {
                tracing::error!("storage failure: {}", other);
                AppError::internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::folder_error::{CompletedObject, FailedObject, PartialFailure};

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let validation: AppError = FolderError::validation("bad").into();
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);

        let missing: AppError = FolderError::NotFound("k".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let upstream: AppError = FolderError::Upstream {
            operation: "copy",
            key: "a".into(),
            bucket: "b".into(),
            region: "local".into(),
            source: StoreError::Unavailable("down".into()),
        }
        .into();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.details.unwrap()["bucket"], "b");
    }

    #[test]
    fn partial_failure_carries_journal() {
        let err = FolderError::PartialFailure(Box::new(PartialFailure {
            operation: "rename".into(),
            completed: vec![CompletedObject {
                key: "a/1".into(),
                destination: Some("b/1".into()),
            }],
            failed: vec![FailedObject {
                key: "a/2".into(),
                message: "boom".into(),
            }],
            pending: vec!["a/3".into()],
        }));
        let app: AppError = err.into();
        assert_eq!(app.status, StatusCode::MULTI_STATUS);
        let details = app.details.unwrap();
        assert_eq!(details["completed"][0]["destination"], "b/1");
        assert_eq!(details["pending"][0], "a/3");
    }
}
