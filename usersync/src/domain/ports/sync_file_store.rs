//! Port abstraction for the folder tree holding exported records.

use std::path::{Path, PathBuf};

use super::define_port_error;

define_port_error! {
    /// Errors raised by sync file store adapters.
    pub enum SyncFileStoreError {
        /// A file could not be read.
        Read { path: String, message: String } => "failed to read {path}: {message}",
        /// A file could not be written.
        Write { path: String, message: String } => "failed to write {path}: {message}",
        /// A folder could not be listed.
        List { path: String, message: String } => "failed to list {path}: {message}",
        /// A file could not be moved into the archive.
        Archive { path: String, message: String } => "failed to archive {path}: {message}",
    }
}

/// Entries directly inside one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    /// Files, sorted by name.
    pub files: Vec<PathBuf>,
    /// Sub-folders, sorted by name.
    pub folders: Vec<PathBuf>,
}

/// Port for reading, writing, enumerating, and archiving sync files.
#[cfg_attr(test, mockall::automock)]
pub trait SyncFileStore: Send + Sync {
    /// Replace the contents of `path`, creating parent folders as needed.
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), SyncFileStoreError>;

    /// Read `path` as UTF-8 text.
    fn read_file(&self, path: &Path) -> Result<String, SyncFileStoreError>;

    /// List `folder`; a missing folder lists as empty.
    fn list_folder(&self, folder: &Path) -> Result<FolderListing, SyncFileStoreError>;

    /// Move `path` to `archive_path`.
    ///
    /// Returns `false` when there was nothing at `path` to archive.
    fn archive_file(&self, path: &Path, archive_path: &Path) -> Result<bool, SyncFileStoreError>;
}
