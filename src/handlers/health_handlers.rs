//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> SQLite connectivity, payload directory I/O, share table size

use crate::handlers::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// HTTP 200 when every check passes, 503 otherwise. The share count is
/// informational: it includes expired records not yet swept.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.storage.db)
        .await
    {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    };
    let disk = probe_disk(&state.storage.base_path).await;

    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from(sqlite));
    checks.insert("disk", CheckStatus::from(disk));
    let overall_ok = checks.values().all(|check| check.ok);

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" }.into(),
        checks,
        shares_held: state.folders.shares().len(),
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Write, read back and remove a scratch file under the payload root.
async fn probe_disk(base: &Path) -> Result<(), String> {
    let tmp_path = base.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&tmp_path, b"readyz")
        .await
        .map_err(|e| format!("could not write tmp file: {}", e))?;
    let read = fs::read(&tmp_path).await;
    let _ = fs::remove_file(&tmp_path).await;
    match read {
        Ok(bytes) if bytes == b"readyz" => Ok(()),
        Ok(_) => Err("file content mismatch".into()),
        Err(e) => Err(format!("could not read tmp file: {}", e)),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<&'static str, CheckStatus>,
    shares_held: usize,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl From<Result<(), String>> for CheckStatus {
    fn from(result: Result<(), String>) -> Self {
        Self {
            ok: result.is_ok(),
            error: result.err(),
        }
    }
}
