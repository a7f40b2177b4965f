//! In-memory document store.

use super::document::{
    Document, DocumentStore, SetOptions, StoreError, collection_segments, document_segments,
    merge_json,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A [`DocumentStore`] kept entirely in memory
///
/// Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    docs: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let depth = collection_segments(collection)?.len() + 1;
        let prefix = format!("{collection}/");

        let docs = self.docs.read();
        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| path.split('/').count() == depth)
            .map(|(path, data)| Document {
                id: path[prefix.len()..].to_string(),
                data: data.clone(),
            })
            .collect())
    }

    async fn get_one(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let segments = document_segments(path)?;
        let id = segments.last().copied().unwrap_or_default().to_string();
        Ok(self
            .docs
            .read()
            .get(path)
            .map(|data| Document {
                id,
                data: data.clone(),
            }))
    }

    async fn set(&self, path: &str, data: Value, options: SetOptions) -> Result<(), StoreError> {
        document_segments(path)?;
        if !data.is_object() {
            return Err(StoreError::NotAnObject(path.to_string()));
        }

        let mut docs = self.docs.write();
        if options.merge {
            if let Some(existing) = docs.get_mut(path) {
                merge_json(existing, data);
                return Ok(());
            }
        }
        docs.insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        document_segments(path)?;
        self.docs.write().remove(path);
        Ok(())
    }
}
