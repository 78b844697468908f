//! Sync file store backed by the local filesystem.
//!
//! Every operation opens the parent folder as a `cap_std` directory and
//! works on a single file name inside it. Paths must be valid UTF-8.

use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use cap_std::{ambient_authority, fs::Dir};

use crate::domain::ports::{FolderListing, SyncFileStore, SyncFileStoreError};

use super::atomic_io::write_atomic;

/// Reads and writes sync documents on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemSyncStore;

impl FilesystemSyncStore {
    /// Create a store operating relative to the current directory.
    pub const fn new() -> Self {
        Self
    }
}

/// A file path split into its parent folder and file name.
struct Located<'a> {
    parent: &'a Utf8Path,
    file_name: &'a str,
}

fn locate(path: &Path) -> Result<Located<'_>, String> {
    let utf8 = Utf8Path::from_path(path).ok_or_else(|| "path is not valid UTF-8".to_owned())?;
    let file_name = utf8
        .file_name()
        .ok_or_else(|| "path does not name a file".to_owned())?;
    let parent = match utf8.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    Ok(Located { parent, file_name })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn open_parent(located: &Located<'_>, create: bool) -> io::Result<Dir> {
    if create {
        Dir::create_ambient_dir_all(located.parent, ambient_authority())?;
    }
    Dir::open_ambient_dir(located.parent, ambient_authority())
}

impl SyncFileStore for FilesystemSyncStore {
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), SyncFileStoreError> {
        let located =
            locate(path).map_err(|message| SyncFileStoreError::write(display(path), message))?;
        open_parent(&located, true)
            .and_then(|dir| write_atomic(&dir, located.file_name, contents.as_bytes()))
            .map_err(|err| SyncFileStoreError::write(display(path), err.to_string()))
    }

    fn read_file(&self, path: &Path) -> Result<String, SyncFileStoreError> {
        let located =
            locate(path).map_err(|message| SyncFileStoreError::read(display(path), message))?;
        open_parent(&located, false)
            .and_then(|dir| dir.read_to_string(located.file_name))
            .map_err(|err| SyncFileStoreError::read(display(path), err.to_string()))
    }

    fn list_folder(&self, folder: &Path) -> Result<FolderListing, SyncFileStoreError> {
        let list_error =
            |err: io::Error| SyncFileStoreError::list(display(folder), err.to_string());
        let dir = match Dir::open_ambient_dir(folder, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(FolderListing::default());
            }
            Err(err) => return Err(list_error(err)),
        };

        let mut listing = FolderListing::default();
        for entry in dir.entries().map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let child: PathBuf = folder.join(entry.file_name());
            if entry.file_type().map_err(list_error)?.is_dir() {
                listing.folders.push(child);
            } else {
                listing.files.push(child);
            }
        }
        listing.files.sort();
        listing.folders.sort();
        Ok(listing)
    }

    fn archive_file(&self, path: &Path, archive_path: &Path) -> Result<bool, SyncFileStoreError> {
        let archive_error = |message: String| SyncFileStoreError::archive(display(path), message);
        let source = locate(path).map_err(archive_error)?;
        let target = locate(archive_path).map_err(archive_error)?;

        let source_dir = match open_parent(&source, false) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(archive_error(err.to_string())),
        };
        match source_dir.metadata(source.file_name) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(archive_error(err.to_string())),
        }

        let target_dir = open_parent(&target, true).map_err(|err| archive_error(err.to_string()))?;
        if source_dir
            .rename(source.file_name, &target_dir, target.file_name)
            .is_ok()
        {
            return Ok(true);
        }

        // Rename fails across devices; fall back to copy then remove.
        let contents = source_dir
            .read(source.file_name)
            .map_err(|err| archive_error(err.to_string()))?;
        write_atomic(&target_dir, target.file_name, &contents)
            .and_then(|()| source_dir.remove_file(source.file_name))
            .map_err(|err| archive_error(err.to_string()))?;
        Ok(true)
    }
}
