//! Raw object transfer against the backing store.
//! Bodies are streamed in both directions rather than buffered in memory.

use crate::{errors::AppError, handlers::AppState, models::object::Object};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;

/// Query string of an issued share URL.
#[derive(Debug, Deserialize)]
pub struct PresignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// PUT `/objects/{*key}` — upload (or overwrite) one object.
pub async fn upload_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let stream = body.into_data_stream().map(|chunk| chunk.map_err(io::Error::other));

    let object = state
        .storage
        .upload_object_stream(&key, content_type, stream)
        .await?;
    tracing::info!("stored {} ({} bytes)", object.key, object.size_bytes);

    let mut resp_headers = HeaderMap::new();
    if let Some(etag) = object.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            resp_headers.insert(header::ETAG, value);
        }
    }
    Ok((
        StatusCode::OK,
        resp_headers,
        Json(json!({ "key": object.key, "size": object.size_bytes })),
    ))
}

/// GET `/objects/{*key}` — stream an object's bytes.
pub async fn get_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    stream_object(&state, &key).await
}

/// HEAD `/objects/{*key}` — same headers as GET, no body.
pub async fn head_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let meta = state.storage.get_object_metadata(&key).await?;
    let mut response = Response::new(Body::empty());
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// GET `/presigned/{encoded_key}?expires=&signature=` — serve an issued URL.
pub async fn get_presigned(
    State(state): State<AppState>,
    Path(encoded_key): Path<String>,
    Query(q): Query<PresignedQuery>,
) -> Result<Response, AppError> {
    let key = state
        .storage
        .verify_presigned(&encoded_key, q.expires, &q.signature)?;
    stream_object(&state, &key).await
}

async fn stream_object(state: &AppState, key: &str) -> Result<Response, AppError> {
    let (meta, file) = state.storage.get_object_reader(key).await?;
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &Object) {
    let content_type = meta
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(meta.size_bytes.max(0) as u64),
    );
    if let Some(etag) = meta.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            headers.insert(header::ETAG, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
