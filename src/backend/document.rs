//! Document store abstraction and the catalog backend built on it.
//!
//! Paths follow the usual document database shape: collections and
//! documents alternate, so `series` is a collection, `series/abc` a
//! document and `series/abc/seasons` a sub-collection. Deleting a document
//! never deletes its sub-collections.

use super::{BackendError, CatalogBackend};
use crate::catalog::{Episode, Season, Series};
use crate::localized::DEFAULT_LANGUAGE;
use crate::storage::StorageError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path does not address a document or collection
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    /// Document data must be a JSON object
    #[error("Document data at {0} is not an object")]
    NotAnObject(String),

    /// The underlying file storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A stored document: its id within the collection and its data
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Options for [`DocumentStore::set`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into the existing document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// An equality filter and/or an ordering on a numeric field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps documents whose `field` equals `value`
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((field.into(), value.into()));
        self
    }

    /// Orders documents by the numeric `field`
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    /// Applies the query to documents already fetched from a collection
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, value)) = &self.filter {
            docs.retain(|d| d.data.get(field) == Some(value));
        }
        if let Some((field, order)) = &self.order_by {
            docs.sort_by(|a, b| {
                let key = |d: &Document| d.data.get(field).and_then(Value::as_f64);
                let ordering = key(a)
                    .partial_cmp(&key(b))
                    .unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        docs
    }
}

/// Trait for document databases the catalog can be stored in.
///
/// No transactions are assumed. Implementations must not cascade deletes
/// into sub-collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists the documents of a collection
    async fn get(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Reads one document
    async fn get_one(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Writes one document, replacing or merging into the existing data
    async fn set(&self, path: &str, data: Value, options: SetOptions) -> Result<(), StoreError>;

    /// Deletes one document; deleting a missing document succeeds
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Runs a filter/order query on a collection
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(query.apply(self.get(collection).await?))
    }
}

/// Splits a path into segments, checking it addresses a collection
pub(crate) fn collection_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Splits a path into segments, checking it addresses a document
pub(crate) fn document_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 != 0 {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Merges `patch` into `target`; nested objects merge, everything else replaces
pub(crate) fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_object() {
                    if let Some(existing) = target.get_mut(&key).filter(|e| e.is_object()) {
                        merge_json(existing, value);
                        continue;
                    }
                }
                target.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// How a series and its children are laid out in the document store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageLayout {
    /// One document per series with seasons and episodes inline
    #[default]
    Embedded,
    /// Series, season and episode documents at composite paths
    /// `series/{id}/seasons/{n}/episodes/{m}`
    SubDocuments,
}

const SERIES_COLLECTION: &str = "series";

fn series_path(series_id: &str) -> String {
    format!("{SERIES_COLLECTION}/{series_id}")
}

fn seasons_path(series_id: &str) -> String {
    format!("{SERIES_COLLECTION}/{series_id}/seasons")
}

fn episodes_path(series_id: &str, season_number: &str) -> String {
    format!("{SERIES_COLLECTION}/{series_id}/seasons/{season_number}/episodes")
}

/// Fills keys that are missing or `null` in a document object
fn with_defaults(mut data: Value, defaults: Vec<(&str, Value)>) -> Value {
    if let Value::Object(map) = &mut data {
        for (key, value) in defaults {
            if map.get(key).is_none_or(Value::is_null) {
                map.insert(key.to_string(), value);
            }
        }
    }
    data
}

fn parse<T: serde::de::DeserializeOwned>(path: &str, data: Value) -> Result<T, BackendError> {
    serde_json::from_value(data).map_err(|e| BackendError::Parse(format!("{path}: {e}")))
}

fn to_object(path: &str, value: impl serde::Serialize) -> Result<Map<String, Value>, BackendError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::NotAnObject(path.to_string()).into()),
        Err(e) => Err(BackendError::Parse(format!("{path}: {e}"))),
    }
}

/// Catalog backend over any [`DocumentStore`]
///
/// Series come back ordered by their default-language title.
pub struct DocumentCatalogBackend<S> {
    store: S,
    layout: StorageLayout,
}

impl<S: DocumentStore> DocumentCatalogBackend<S> {
    /// Creates a backend storing series in `layout`
    pub fn new(store: S, layout: StorageLayout) -> Self {
        Self { store, layout }
    }

    /// Returns the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_embedded(&self) -> Result<Vec<Series>, BackendError> {
        let mut result = Vec::new();
        for doc in self.store.get(SERIES_COLLECTION).await? {
            let path = series_path(&doc.id);
            let data = with_defaults(doc.data, vec![("id", Value::String(doc.id))]);
            result.push(parse::<Series>(&path, data)?);
        }
        Ok(result)
    }

    async fn load_sub_documents(&self) -> Result<Vec<Series>, BackendError> {
        let mut result = Vec::new();
        for doc in self.store.get(SERIES_COLLECTION).await? {
            let path = series_path(&doc.id);
            let data = with_defaults(doc.data, vec![("id", Value::String(doc.id.clone()))]);
            let mut series = parse::<Series>(&path, data)?;
            series.seasons = self.load_seasons(&doc.id).await?;
            result.push(series);
        }
        Ok(result)
    }

    async fn load_seasons(&self, series_doc_id: &str) -> Result<Vec<Season>, BackendError> {
        let mut seasons = Vec::new();
        for season_doc in self.store.get(&seasons_path(series_doc_id)).await? {
            let number = season_doc
                .data
                .get("number")
                .and_then(Value::as_u64)
                .or_else(|| season_doc.id.parse().ok())
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    BackendError::Parse(format!(
                        "season {} of series {} has no number",
                        season_doc.id, series_doc_id
                    ))
                })?;
            let id = season_doc
                .data
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("season-{number}"));

            let query = Query::new().order_by("number", SortOrder::Ascending);
            let episodes_collection = episodes_path(series_doc_id, &season_doc.id);
            let mut episodes = Vec::new();
            for episode_doc in self.store.query(&episodes_collection, &query).await? {
                let path = format!("{episodes_collection}/{}", episode_doc.id);
                let mut defaults = vec![("id", Value::String(episode_doc.id.clone()))];
                if let Ok(n) = episode_doc.id.parse::<u32>() {
                    defaults.push(("number", Value::from(n)));
                }
                let data = with_defaults(episode_doc.data, defaults);
                episodes.push(parse::<Episode>(&path, data)?);
            }

            seasons.push(Season {
                id,
                number,
                episodes,
            });
        }
        Ok(seasons)
    }

    async fn put_sub_documents(&self, series: &Series) -> Result<(), BackendError> {
        let path = series_path(&series.id);
        let mut head = to_object(&path, series)?;
        head.remove("seasons");
        self.store
            .set(&path, Value::Object(head), SetOptions::default())
            .await?;

        for season in &series.seasons {
            let season_key = season.number.to_string();
            let season_path = format!("{}/{}", seasons_path(&series.id), season_key);
            let data = serde_json::json!({ "id": season.id, "number": season.number });
            self.store
                .set(&season_path, data, SetOptions::default())
                .await?;

            let episodes_collection = episodes_path(&series.id, &season_key);
            for episode in &season.episodes {
                let episode_path = format!("{episodes_collection}/{}", episode.number);
                let data = Value::Object(to_object(&episode_path, episode)?);
                self.store
                    .set(&episode_path, data, SetOptions::default())
                    .await?;
            }

            // Drop episodes that were removed or renumbered
            for stale in self.store.get(&episodes_collection).await? {
                let kept = season
                    .episodes
                    .iter()
                    .any(|e| e.number.to_string() == stale.id);
                if !kept {
                    self.store
                        .delete(&format!("{episodes_collection}/{}", stale.id))
                        .await?;
                }
            }
        }

        for stale in self.store.get(&seasons_path(&series.id)).await? {
            let kept = series
                .seasons
                .iter()
                .any(|s| s.number.to_string() == stale.id);
            if !kept {
                self.delete_season_cascade(&series.id, &stale.id).await?;
            }
        }
        Ok(())
    }

    async fn delete_season_cascade(
        &self,
        series_id: &str,
        season_key: &str,
    ) -> Result<(), BackendError> {
        let episodes_collection = episodes_path(series_id, season_key);
        for episode in self.store.get(&episodes_collection).await? {
            self.store
                .delete(&format!("{episodes_collection}/{}", episode.id))
                .await?;
        }
        self.store
            .delete(&format!("{}/{}", seasons_path(series_id), season_key))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore> CatalogBackend for DocumentCatalogBackend<S> {
    async fn load_all(&self) -> Result<Vec<Series>, BackendError> {
        let mut series = match self.layout {
            StorageLayout::Embedded => self.load_embedded().await?,
            StorageLayout::SubDocuments => self.load_sub_documents().await?,
        };
        series.sort_by(|a, b| {
            let a_title = a.title.resolve(DEFAULT_LANGUAGE).to_lowercase();
            let b_title = b.title.resolve(DEFAULT_LANGUAGE).to_lowercase();
            a_title.cmp(&b_title).then_with(|| a.id.cmp(&b.id))
        });
        Ok(series)
    }

    async fn put_series(&self, series: &Series) -> Result<(), BackendError> {
        match self.layout {
            StorageLayout::Embedded => {
                let path = series_path(&series.id);
                let data = Value::Object(to_object(&path, series)?);
                self.store.set(&path, data, SetOptions::default()).await?;
                Ok(())
            }
            StorageLayout::SubDocuments => self.put_sub_documents(series).await,
        }
    }

    async fn remove_series(&self, series_id: &str) -> Result<(), BackendError> {
        if self.layout == StorageLayout::SubDocuments {
            // Sub-collections survive a parent delete, so remove them first
            for season in self.store.get(&seasons_path(series_id)).await? {
                self.delete_season_cascade(series_id, &season.id).await?;
            }
        }
        self.store.delete(&series_path(series_id)).await?;
        Ok(())
    }
}
