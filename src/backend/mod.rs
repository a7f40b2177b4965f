//! Catalog persistence backends.
//!
//! A backend loads the whole catalog and persists one series at a time.
//! Two families exist: document stores ([`DocumentCatalogBackend`] over a
//! [`DocumentStore`]) and the key-value HTTP endpoint ([`KvCatalogBackend`]).
mod document;
mod file;
mod kv;
mod memory;

pub use document::{
    Document, DocumentCatalogBackend, DocumentStore, Query, SetOptions, SortOrder, StorageLayout,
    StoreError,
};
pub use file::FileDocumentStore;
pub use kv::{CatalogBlob, KvCatalogBackend};
pub use memory::MemoryDocumentStore;

use crate::catalog::Series;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while loading or persisting the catalog.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request to the remote endpoint failed
    #[error("Request failed: {0}")]
    Request(String),

    /// The remote endpoint rejected the admin password
    #[error("Unauthorized: the admin password was rejected")]
    Unauthorized,

    /// The remote endpoint answered with an error status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A stored document could not be interpreted
    #[error("Failed to parse stored data: {0}")]
    Parse(String),

    /// The document store failed
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
}

/// Trait for storage that can hold the series catalog.
///
/// Implementors persist whole series: `put_series` replaces everything
/// stored for that series, so saving the same value twice leaves the same
/// stored state.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Loads every series; an absent catalog yields an empty list
    async fn load_all(&self) -> Result<Vec<Series>, BackendError>;

    /// Inserts or replaces one series, including its seasons and episodes
    async fn put_series(&self, series: &Series) -> Result<(), BackendError>;

    /// Removes one series and everything below it
    async fn remove_series(&self, series_id: &str) -> Result<(), BackendError>;
}
