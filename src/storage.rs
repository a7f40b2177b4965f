//! JSON file storage module
//!
//! This module provides persistent storage of JSON documents below a root
//! directory. Each document lives in its own `<name>.json` file; nested
//! names map to nested directories. Writes go through a temporary file and
//! an atomic rename.

use crate::temp::write_temp_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to determine data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create or access a storage directory
    #[error("Failed to create storage directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read stored data
    #[error("Failed to read storage file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write stored data
    #[error("Failed to write storage file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove stored data
    #[error("Failed to remove storage file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize stored data
    #[error("Failed to deserialize storage file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for storage
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Returns the platform data directory for the application
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    let proj_dirs = directories::ProjectDirs::from("lu", "letzview", "letzview")
        .ok_or(StorageError::DataDirectoryNotFound)?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// A directory of JSON documents
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// The directory where documents are stored
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens or creates a store rooted at `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding the documents; created if missing
    ///
    /// # Returns
    ///
    /// A Result containing the JsonFileStore or a StorageError
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let store = JsonFileStore::open(default_data_dir()?.join("catalog"))?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        create_dir(&root)?;
        Ok(Self { root })
    }

    /// Loads the document stored under `name`
    ///
    /// # Arguments
    ///
    /// * `name` - A `/`-separated document path; each segment is sanitized
    ///
    /// # Returns
    ///
    /// An Option containing the document if it exists, or None if it
    /// doesn't. Returns an error if the document exists but cannot be read
    /// or deserialized.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// if let Some(series) = store.load::<Series>("series/01hx")? {
    ///     println!("{}", series.title.resolve("en"));
    /// }
    /// ```
    pub fn load<T>(&self, name: &str) -> Result<Option<T>, StorageError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let file_path = self.file_path(name);

        // If file doesn't exist, return None
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| StorageError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        let data =
            serde_json::from_str(&content).map_err(|e| StorageError::DeserializationFailed {
                path: file_path,
                source: e,
            })?;

        Ok(Some(data))
    }

    /// Stores `data` under `name`, replacing any previous document
    ///
    /// The document is written to a temporary file first and renamed into
    /// place, so readers never see a partial write.
    ///
    /// # Arguments
    ///
    /// * `name` - A `/`-separated document path; each segment is sanitized
    /// * `data` - The document to store
    ///
    /// # Returns
    ///
    /// `Ok(())` on success, or a StorageError if serialization or writing fails
    pub fn store<T>(&self, name: &str, data: &T) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
    {
        let file_path = self.file_path(name);
        let dir = file_path.parent().unwrap_or(&self.root).to_path_buf();
        create_dir(&dir)?;

        let content = serde_json::to_string_pretty(data)?;

        let temp = write_temp_file(&dir, "doc", content.as_bytes()).map_err(|e| {
            StorageError::WriteFailed {
                path: file_path.clone(),
                source: e,
            }
        })?;
        temp.persist(&file_path)
            .map_err(|e| StorageError::WriteFailed {
                path: file_path,
                source: e,
            })?;

        Ok(())
    }

    /// Removes the document stored under `name`
    ///
    /// Nested documents below `name` are left in place. Removing a missing
    /// document is not an error.
    ///
    /// # Arguments
    ///
    /// * `name` - A `/`-separated document path
    pub fn remove(&self, name: &str) -> Result<(), StorageError> {
        let file_path = self.file_path(name);
        match fs::remove_file(&file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                path: file_path,
                source: e,
            }),
        }
    }

    /// Lists the document names directly below `collection`
    ///
    /// # Returns
    ///
    /// The sanitized document names in ascending order; empty when the
    /// collection does not exist
    pub fn list(&self, collection: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.dir_path(collection);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| StorageError::ReadFailed {
            path: dir.clone(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::ReadFailed {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                // Skip in-flight temporary files
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    /// Returns the root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| {
                path.join(sanitize_name(segment))
            })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        let mut path = self.dir_path(name);
        path.set_extension("json");
        path
    }
}

fn create_dir(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path).map_err(|e| StorageError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
