//! HTTP proxy service
//!
//! Hosts the key-value catalog endpoint (`/api/db`) and the translation
//! endpoint (`/api/translate`).

mod db;
mod translate;

pub use db::CATALOG_KEY;
pub use translate::GoogleTranslator;

use crate::config::ServerConfig;
use crate::storage::{JsonFileStore, StorageError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Errors that can occur while starting or running the service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The blob storage could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// An error answered as `{"error": message}`
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Shared state of the service
#[derive(Clone)]
pub struct AppState {
    blobs: JsonFileStore,
    admin_password: Arc<str>,
    translator: Option<Arc<GoogleTranslator>>,
}

impl AppState {
    pub fn new(
        blobs: JsonFileStore,
        admin_password: impl Into<String>,
        translator: Option<GoogleTranslator>,
    ) -> Self {
        Self {
            blobs,
            admin_password: Arc::from(admin_password.into()),
            translator: translator.map(Arc::new),
        }
    }

    /// Builds the state described by `config`
    pub fn from_config(config: &ServerConfig, http: reqwest::Client) -> Result<Self, ServerError> {
        let blobs = JsonFileStore::open(config.data_dir()?)?;
        let translator = config
            .translate_api_key()
            .map(|key| GoogleTranslator::new(http, &config.translate_upstream, key));
        if translator.is_none() {
            tracing::warn!("GOOGLE_TRANSLATE_API_KEY is not set, translation is disabled");
        }
        Ok(Self::new(blobs, config.admin_password.clone(), translator))
    }
}

/// Creates the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/db", get(db::get_catalog).post(db::put_catalog))
        .route("/api/translate", post(translate::translate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the service until it fails
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let state = AppState::from_config(&config, reqwest::Client::new())?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    tracing::info!("Starting server on {}", config.bind);

    axum::serve(listener, app).await.map_err(ServerError::Serve)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Serves `app` on an ephemeral local port and returns its base URL
    pub(crate) async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
