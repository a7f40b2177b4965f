//! Key-value endpoint backend.
//!
//! The whole catalog is a single JSON blob behind `GET/POST /api/db`.
//! Persisting one series reads the blob, replaces that series and writes
//! the blob back.

use super::{BackendError, CatalogBackend};
use crate::catalog::Series;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The catalog blob stored behind the key-value endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogBlob {
    #[serde(default, deserialize_with = "crate::localized::nullable")]
    pub series: Vec<Series>,
}

/// Body of a write request
#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    password: &'a str,
    data: &'a CatalogBlob,
}

/// Error body returned by the endpoint
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Catalog backend talking to the key-value HTTP endpoint
///
/// Series keep the order they have in the blob; new series are appended.
pub struct KvCatalogBackend {
    client: reqwest::Client,
    endpoint: String,
    password: String,
}

impl KvCatalogBackend {
    /// Creates a backend for the service at `base_url` (e.g. `http://localhost:3000`)
    pub fn new(client: reqwest::Client, base_url: &str, password: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/db", base_url.trim_end_matches('/')),
            password: password.into(),
        }
    }

    async fn read_blob(&self) -> Result<CatalogBlob, BackendError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let response = check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        if body.is_null() {
            return Ok(CatalogBlob::default());
        }
        serde_json::from_value(body).map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn write_blob(&self, blob: &CatalogBlob) -> Result<(), BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&WriteRequest {
                password: &self.password,
                data: blob,
            })
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or(text);
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CatalogBackend for KvCatalogBackend {
    async fn load_all(&self) -> Result<Vec<Series>, BackendError> {
        Ok(self.read_blob().await?.series)
    }

    async fn put_series(&self, series: &Series) -> Result<(), BackendError> {
        let mut blob = self.read_blob().await?;
        match blob.series.iter_mut().find(|s| s.id == series.id) {
            Some(existing) => *existing = series.clone(),
            None => blob.series.push(series.clone()),
        }
        self.write_blob(&blob).await
    }

    async fn remove_series(&self, series_id: &str) -> Result<(), BackendError> {
        let mut blob = self.read_blob().await?;
        let before = blob.series.len();
        blob.series.retain(|s| s.id != series_id);
        if blob.series.len() == before {
            return Ok(());
        }
        self.write_blob(&blob).await
    }
}
