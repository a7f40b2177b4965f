//! Document store on top of the JSON file storage.

use super::document::{
    Document, DocumentStore, SetOptions, StoreError, collection_segments, document_segments,
    merge_json,
};
use crate::storage::JsonFileStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// A [`DocumentStore`] persisting each document as a JSON file
///
/// Document `series/abc` lives in `<root>/series/abc.json`; its
/// sub-collections live in `<root>/series/abc/`. Path segments are
/// sanitized (lowercased), so ids that differ only in case collide; the
/// catalog keeps the exact id inside each document.
pub struct FileDocumentStore {
    files: JsonFileStore,
    // Serializes read-modify-write merges
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(files: JsonFileStore) -> Self {
        Self {
            files,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        collection_segments(collection)?;
        let mut docs = Vec::new();
        for id in self.files.list(collection)? {
            if let Some(data) = self.files.load::<Value>(&format!("{collection}/{id}"))? {
                docs.push(Document { id, data });
            }
        }
        Ok(docs)
    }

    async fn get_one(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let segments = document_segments(path)?;
        let id = segments.last().copied().unwrap_or_default().to_string();
        Ok(self
            .files
            .load::<Value>(path)?
            .map(|data| Document { id, data }))
    }

    async fn set(&self, path: &str, data: Value, options: SetOptions) -> Result<(), StoreError> {
        document_segments(path)?;
        if !data.is_object() {
            return Err(StoreError::NotAnObject(path.to_string()));
        }

        let _guard = self.write_lock.lock();
        let data = match self.files.load::<Value>(path)? {
            Some(mut existing) if options.merge => {
                merge_json(&mut existing, data);
                existing
            }
            _ => data,
        };
        self.files.store(path, &data)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        document_segments(path)?;
        let _guard = self.write_lock.lock();
        self.files.remove(path)?;
        Ok(())
    }
}
