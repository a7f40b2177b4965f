//! LetzView - A multi-language video catalog
//!
//! This library provides the catalog of series, seasons and episodes with
//! its admin mutations, the backends it can be stored in, synchronized
//! dual-track playback, and the HTTP service hosting the key-value catalog
//! and translation endpoints.

pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod localized;
pub mod player;
pub mod server;
pub mod storage;
pub mod translate;
mod temp;

use backend::{DocumentCatalogBackend, FileDocumentStore, StorageLayout};
use catalog::CatalogClient;
use std::path::Path;
use storage::JsonFileStore;

// Re-export error types
pub use auth::AuthError;
pub use backend::{BackendError, StoreError};
pub use catalog::CatalogError;
pub use player::{MediaError, PlayerError};
pub use server::ServerError;
pub use storage::StorageError;
pub use translate::TranslateError;

// Re-export the main types
pub use catalog::{
    AudioTrack, CatalogAdmin, CatalogSnapshot, Episode, EpisodeDraft, EpisodePatch, NewSeries,
    Season, Series, SeriesPatch, SubtitleTrack,
};
pub use localized::LocalizedText;

use thiserror::Error;

/// Top-level error type for LetzView operations
#[derive(Debug, Error)]
pub enum LetzViewError {
    /// Error during a catalog operation
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error from a catalog backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error during file storage operations
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Error while signing in
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Error while translating
    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    /// Error during playback
    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    /// Error running the HTTP service
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Catalog client over a JSON file tree
pub type FileCatalog = CatalogClient<DocumentCatalogBackend<FileDocumentStore>>;

/// Opens the catalog stored under `directory` and loads it
///
/// # Examples
///
/// ```no_run
/// use letzview::backend::StorageLayout;
/// use std::path::Path;
///
/// # async fn run() -> Result<(), letzview::LetzViewError> {
/// let root = Path::new("/srv/letzview");
/// let catalog = letzview::open_file_catalog(root, StorageLayout::Embedded).await?;
/// for series in catalog.catalog().iter() {
///     println!("{}", series.title.resolve("en"));
/// }
/// # Ok(())
/// # }
/// ```
pub async fn open_file_catalog(
    directory: &Path,
    layout: StorageLayout,
) -> Result<FileCatalog, LetzViewError> {
    let store = FileDocumentStore::new(JsonFileStore::open(directory)?);
    let client = CatalogClient::new(DocumentCatalogBackend::new(store, layout));
    let series = client.fetch_catalog().await?;
    tracing::debug!(count = series.len(), directory = %directory.display(), "Opened file catalog");
    Ok(client)
}
