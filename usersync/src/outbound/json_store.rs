//! Identity service persisted as a JSON snapshot.
//!
//! The snapshot names the organisation shape alongside the users and role
//! grants:
//!
//! ```json
//! {
//!   "organisation": { "shape": "userTypes", "types": ["admin", "editor"] },
//!   "users": [],
//!   "roles": { "ada": ["reviewer"] }
//! }
//! ```
//!
//! The store loads the snapshot into an [`InMemoryIdentityService`] and
//! writes it back atomically on [`JsonIdentityStore::persist`].

use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ports::{
    IdentityServiceError, IdentityState, InMemoryIdentityService, OrganisationShape,
};

use super::atomic_io::write_atomic;

/// Errors raised while loading or saving the identity snapshot.
#[derive(Debug, Error)]
pub enum JsonStoreError {
    /// The snapshot path is not usable.
    #[error("invalid store path {path}: {message}")]
    InvalidPath {
        /// Offending path.
        path: Utf8PathBuf,
        /// Why it was rejected.
        message: String,
    },
    /// The snapshot does not exist.
    #[error("identity store {path} does not exist")]
    Missing {
        /// Snapshot path.
        path: Utf8PathBuf,
    },
    /// Reading or writing the snapshot failed.
    #[error("failed to access identity store {path}: {message}")]
    Io {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// I/O error message.
        message: String,
    },
    /// The snapshot is not valid JSON for this schema.
    #[error("failed to parse identity store {path}: {message}")]
    Parse {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Parser message.
        message: String,
    },
    /// The in-memory service could not produce a snapshot.
    #[error(transparent)]
    Identity(#[from] IdentityServiceError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSnapshot {
    organisation: OrganisationShape,
    #[serde(flatten)]
    state: IdentityState,
}

/// JSON-file backed identity service.
#[derive(Debug, Clone)]
pub struct JsonIdentityStore {
    path: Utf8PathBuf,
    service: Arc<InMemoryIdentityService>,
}

impl JsonIdentityStore {
    /// Load the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Missing`] when the file does not exist and
    /// [`JsonStoreError::Parse`] when it is not a valid snapshot.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, JsonStoreError> {
        let path = path.into();
        let (dir, file_name) = open_parent(&path, false)?;
        let raw = dir.read_to_string(file_name).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                JsonStoreError::Missing { path: path.clone() }
            } else {
                JsonStoreError::Io {
                    path: path.clone(),
                    message: err.to_string(),
                }
            }
        })?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&raw).map_err(|err| JsonStoreError::Parse {
                path: path.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            service: Arc::new(InMemoryIdentityService::with_state(
                snapshot.organisation,
                snapshot.state,
            )),
            path,
        })
    }

    /// Start an empty store at `path` with the given shape. Nothing is
    /// written until [`Self::persist`].
    pub fn create(path: impl Into<Utf8PathBuf>, shape: OrganisationShape) -> Self {
        Self {
            path: path.into(),
            service: Arc::new(InMemoryIdentityService::new(shape)),
        }
    }

    /// Snapshot location.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The live service backed by this store.
    pub fn service(&self) -> Arc<InMemoryIdentityService> {
        Arc::clone(&self.service)
    }

    /// Write the current state back to disk atomically.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Io`] when the snapshot cannot be written.
    pub fn persist(&self) -> Result<(), JsonStoreError> {
        let snapshot = StoreSnapshot {
            organisation: self.service.shape().clone(),
            state: self.service.snapshot()?,
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|err| JsonStoreError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        let (dir, file_name) = open_parent(&self.path, true)?;
        write_atomic(&dir, file_name, json.as_bytes()).map_err(|err| JsonStoreError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }
}

fn open_parent(path: &Utf8Path, create: bool) -> Result<(Dir, &str), JsonStoreError> {
    let file_name = path.file_name().ok_or_else(|| JsonStoreError::InvalidPath {
        path: path.to_path_buf(),
        message: "path does not name a file".to_owned(),
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let io_error = |err: io::Error| {
        if err.kind() == io::ErrorKind::NotFound {
            JsonStoreError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            JsonStoreError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    };
    if create {
        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(io_error)?;
    }
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    //! Snapshot loading and persistence against a scratch directory.

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;
    use crate::domain::ports::{IdentityService, RoleProvider, UserTypeCapability};

    #[fixture]
    fn scratch() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn store_path(scratch: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(scratch.path().join("state/identity.json"))
            .expect("utf-8 temp path")
    }

    #[rstest]
    fn persisted_state_reloads(scratch: TempDir) {
        let path = store_path(&scratch);
        let store = JsonIdentityStore::create(
            path.clone(),
            OrganisationShape::UserTypes {
                types: vec!["editor".to_owned()],
            },
        );
        let service = store.service();
        let user = service
            .create_user_with_type("ada", "ada@example.org", "editor")
            .expect("create user");
        service
            .grant_roles("ada", vec!["reviewer".to_owned()])
            .expect("grant roles");
        store.persist().expect("persist");

        let reopened = JsonIdentityStore::open(path).expect("reopen");
        let service = reopened.service();
        assert_eq!(
            service.find_by_email("ada@example.org").expect("lookup"),
            Some(user)
        );
        assert_eq!(
            service.roles_for_user("ada").expect("roles"),
            vec!["reviewer".to_owned()]
        );
        assert_eq!(
            service.shape(),
            &OrganisationShape::UserTypes {
                types: vec!["editor".to_owned()]
            }
        );
    }

    #[rstest]
    fn missing_snapshot_is_reported(scratch: TempDir) {
        let result = JsonIdentityStore::open(store_path(&scratch));
        assert!(matches!(result, Err(JsonStoreError::Missing { .. })));
    }

    #[rstest]
    fn malformed_snapshot_is_reported(scratch: TempDir) {
        let path = scratch.path().join("identity.json");
        std::fs::write(&path, "{ \"users\": [] }").expect("write snapshot");
        let result = JsonIdentityStore::open(
            Utf8PathBuf::from_path_buf(path).expect("utf-8 temp path"),
        );
        assert!(matches!(result, Err(JsonStoreError::Parse { .. })));
    }

    #[test]
    fn snapshot_layout_is_documented_shape() {
        let snapshot: StoreSnapshot = serde_json::from_str(
            r#"{
                "organisation": { "shape": "userGroups", "groups": ["admin"] },
                "users": [],
                "roles": { "ada": ["reviewer"] }
            }"#,
        )
        .expect("parse snapshot");
        assert_eq!(
            snapshot.organisation,
            OrganisationShape::UserGroups {
                groups: vec!["admin".to_owned()]
            }
        );
        assert_eq!(snapshot.state.roles.len(), 1);
    }
}
