//! Key-value catalog endpoint.
//!
//! The catalog is stored as one opaque JSON object. Reads are public;
//! writes must carry the admin password.

use super::{ApiError, AppState};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

/// Storage key of the catalog blob
pub const CATALOG_KEY: &str = "letzview:db";

#[derive(Debug, Default, Deserialize)]
struct WriteBody {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// `GET /api/db`
pub(super) async fn get_catalog(State(state): State<AppState>) -> Result<Response, ApiError> {
    let blob = state.blobs.load::<Value>(CATALOG_KEY).map_err(|e| {
        tracing::error!(error = %e, "Failed to read catalog blob");
        ApiError::internal("Server error")
    })?;

    let blob = match blob {
        Some(Value::Null) | None => json!({ "series": [] }),
        Some(value) => value,
    };
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(blob)).into_response())
}

/// `POST /api/db` with `{password, data}`
pub(super) async fn put_catalog(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // An unreadable body carries no password
    let body: WriteBody = serde_json::from_slice(&body).unwrap_or_default();

    if body.password.as_deref() != Some(&*state.admin_password) {
        tracing::warn!("Rejected catalog write with a wrong password");
        return Err(ApiError::unauthorized());
    }

    let data = match body.data {
        Some(data @ Value::Object(_)) => data,
        _ => return Err(ApiError::bad_request("Invalid body")),
    };

    state.blobs.store(CATALOG_KEY, &data).map_err(|e| {
        tracing::error!(error = %e, "Failed to write catalog blob");
        ApiError::internal("Server error")
    })?;

    tracing::info!("Catalog blob updated");
    Ok(Json(json!({ "ok": true })))
}
