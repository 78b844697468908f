//! Where records live in the file tree and its archive.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Folder under the sync root holding user documents.
pub const SYNC_FOLDER_NAME: &str = "User";

/// Extension of user documents.
pub const FILE_EXTENSION: &str = "config";

/// Characters that cannot appear in a file name on common filesystems.
const ILLEGAL_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn an e-mail address into a file stem.
///
/// Characters illegal in file names and control characters are removed and
/// dots become dashes.
///
/// # Examples
/// ```
/// use usersync::domain::safe_file_stem;
///
/// assert_eq!(safe_file_stem("ada.lovelace@example.org"), "ada-lovelace@example-org");
/// assert_eq!(safe_file_stem("a<b>|c@x.io"), "abc@x-io");
/// ```
pub fn safe_file_stem(email: &str) -> String {
    email
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_FILE_NAME_CHARS.contains(c))
        .map(|c| if c == '.' { '-' } else { c })
        .collect()
}

/// Whether `path` carries the user document extension.
pub fn is_sync_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case(FILE_EXTENSION))
}

/// Sync root and archive root of a file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLayout {
    root: PathBuf,
    archive_root: PathBuf,
}

impl SyncLayout {
    /// Layout rooted at `root`, archiving into `archive_root`.
    pub fn new(root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive_root: archive_root.into(),
        }
    }

    /// Sync root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding user documents below `root`.
    pub fn user_folder(root: &Path) -> PathBuf {
        root.join(SYNC_FOLDER_NAME)
    }

    /// Document path for the user with `email` below `root`.
    pub fn file_for(root: &Path, email: &str) -> PathBuf {
        Self::user_folder(root).join(format!("{}.{FILE_EXTENSION}", safe_file_stem(email)))
    }

    /// Archive path for the user with `email`, stamped with `at`.
    pub fn archive_file_for(&self, email: &str, at: DateTime<Utc>) -> PathBuf {
        self.archive_root.join(SYNC_FOLDER_NAME).join(format!(
            "{}_{}.{FILE_EXTENSION}",
            safe_file_stem(email),
            at.format("%Y%m%d_%H%M%S")
        ))
    }
}
