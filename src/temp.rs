//! Temporary file management module
//!
//! This module provides RAII-based temporary files used for atomic writes:
//! content is written next to its destination and renamed into place, so a
//! reader never sees a half-written document.

use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for a temporary file that is deleted on drop unless persisted
#[derive(Debug)]
pub(crate) struct TempGuard {
    path: Option<PathBuf>,
}

impl TempGuard {
    /// Get the path to the temporary file
    pub(crate) fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Moves the temporary file to `destination`, replacing any existing file
    ///
    /// On success the guard no longer owns the file and will not delete it.
    pub(crate) fn persist(mut self, destination: &Path) -> io::Result<()> {
        if let Some(path) = self.path.take() {
            if let Err(e) = fs::rename(&path, destination) {
                // Hand ownership back so drop cleans up
                self.path = Some(path);
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(path);
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Creates a temporary file in `dir` holding `contents`
///
/// The file is named `.{prefix}_{ulid}.tmp` and must live on the same
/// filesystem as the destination it is later persisted to.
pub(crate) fn write_temp_file(dir: &Path, prefix: &str, contents: &[u8]) -> io::Result<TempGuard> {
    let ulid = ulid::Ulid::new();
    let path = dir.join(format!(".{}_{}.tmp", prefix, ulid));

    // Create the guard first so a failed write still removes the file
    let mut file = File::create(&path)?;
    let guard = TempGuard { path: Some(path) };
    file.write_all(contents)?;
    file.sync_all()?;

    Ok(guard)
}
