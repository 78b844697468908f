//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from `USERSYNC_*` environment variables and configuration
//! files; the command line overrides individual paths.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{OrganisationModel, UnknownOrganisationModel};

const DEFAULT_ROOT: &str = "usync";
const DEFAULT_ARCHIVE_ROOT: &str = "usync-archive";
const DEFAULT_STORE: &str = "usync-identity.json";
const DEFAULT_SEED_NAME: &str = "ledger-heron";
const AUTO_MODEL: &str = "auto";

fn default_registry_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("seeds.json")
}

/// Synchronisation settings.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERSYNC")]
pub struct SyncSettings {
    /// Root of the exported file tree.
    pub root: Option<PathBuf>,
    /// Folder receiving archived documents of deleted users.
    pub archive_root: Option<PathBuf>,
    /// JSON identity store snapshot.
    pub store: Option<PathBuf>,
    /// `auto` to inspect the identity service, or a fixed model name.
    pub organisation_model: Option<String>,
    /// Seed registry used by `usersync seed`.
    pub registry_path: Option<PathBuf>,
    /// Seed to generate from the registry.
    pub seed_name: Option<String>,
}

impl SyncSettings {
    /// Root of the exported file tree.
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
    }

    /// Archive folder for deleted users.
    pub fn archive_root(&self) -> PathBuf {
        self.archive_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_ROOT))
    }

    /// Identity store snapshot path.
    pub fn store(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE))
    }

    /// Configured organisation model; `None` means inspect the service.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownOrganisationModel`] for names other than `auto`,
    /// `single-select`, and `multi-group` (or their short forms).
    pub fn organisation_model(
        &self,
    ) -> Result<Option<OrganisationModel>, UnknownOrganisationModel> {
        match self.organisation_model.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) if name.eq_ignore_ascii_case(AUTO_MODEL) => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    /// Seed registry path.
    pub fn registry_path(&self) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(default_registry_path)
    }

    /// Seed name to generate.
    pub fn seed_name(&self) -> &str {
        self.seed_name.as_deref().unwrap_or(DEFAULT_SEED_NAME)
    }
}
