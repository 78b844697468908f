//! In-memory sync file store used by domain and behaviour tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{FolderListing, SyncFileStore, SyncFileStoreError};

/// Sync file store keeping file contents in a map keyed by path.
#[derive(Debug, Default)]
pub struct InMemorySyncFileStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl InMemorySyncFileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of `path`, if present.
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.guard().ok()?.get(path).cloned()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.guard()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, BTreeMap<PathBuf, String>>, SyncFileStoreError> {
        self.files
            .lock()
            .map_err(|_| SyncFileStoreError::list("<memory>", "file map lock poisoned"))
    }
}

impl SyncFileStore for InMemorySyncFileStore {
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), SyncFileStoreError> {
        self.guard()?.insert(path.to_path_buf(), contents.to_owned());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, SyncFileStoreError> {
        self.guard()?
            .get(path)
            .cloned()
            .ok_or_else(|| SyncFileStoreError::read(path.display().to_string(), "no such file"))
    }

    fn list_folder(&self, folder: &Path) -> Result<FolderListing, SyncFileStoreError> {
        let files = self.guard()?;
        let mut listing = FolderListing::default();
        let mut folders = BTreeSet::new();
        for path in files.keys() {
            let Ok(relative) = path.strip_prefix(folder) else {
                continue;
            };
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            if components.next().is_some() {
                folders.insert(folder.join(first));
            } else {
                listing.files.push(path.clone());
            }
        }
        listing.folders = folders.into_iter().collect();
        Ok(listing)
    }

    fn archive_file(&self, path: &Path, archive_path: &Path) -> Result<bool, SyncFileStoreError> {
        let mut files = self.guard()?;
        let Some(contents) = files.remove(path) else {
            return Ok(false);
        };
        files.insert(archive_path.to_path_buf(), contents);
        Ok(true)
    }
}
