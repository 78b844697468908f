//! Wiring of adapters, settings, and the orchestrator for the binary.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;
use example_users::{ExampleUserSeed, GenerationError, RegistryError, SeedRegistry};
use mockable::DefaultClock;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::{
    IdentityService, IdentityServiceError, InMemoryIdentityService, OrganisationShape, SyncPause,
};
use crate::domain::{
    Membership, OrganisationModel, OrganisationModelCache, SyncLayout, SyncOrchestrator,
    SyncOutcome, SyncPorts, UnknownOrganisationModel, UserId, UserRecord,
};
use crate::outbound::{FilesystemSyncStore, JsonIdentityStore, JsonStoreError};
use crate::settings::SyncSettings;

/// Errors raised while assembling or running the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// The organisation model setting is not recognised.
    #[error(transparent)]
    Model(#[from] UnknownOrganisationModel),
    /// The identity store could not be loaded or saved.
    #[error(transparent)]
    Store(#[from] JsonStoreError),
    /// The identity service failed outside a per-record operation.
    #[error(transparent)]
    Identity(#[from] IdentityServiceError),
    /// The seed registry could not be read.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Example users could not be generated.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// A configured path is not valid UTF-8.
    #[error("path {path} is not valid UTF-8")]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
}

fn utf8_path(path: PathBuf) -> Result<Utf8PathBuf, AppError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| AppError::NonUtf8Path { path })
}

/// A JSON identity store driven through a [`SyncOrchestrator`].
pub struct SyncApp {
    store: JsonIdentityStore,
    pause: Arc<SyncPause>,
    orchestrator: SyncOrchestrator,
    root: PathBuf,
}

impl SyncApp {
    /// Open the configured identity store and file tree.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the store cannot be loaded or the
    /// organisation model setting is invalid.
    pub fn open(settings: &SyncSettings) -> Result<Self, AppError> {
        let store = JsonIdentityStore::open(utf8_path(settings.store())?)?;
        Self::over_store(settings, store)
    }

    fn over_store(settings: &SyncSettings, store: JsonIdentityStore) -> Result<Self, AppError> {
        let cache = match settings.organisation_model()? {
            Some(model) => OrganisationModelCache::preset(model),
            None => OrganisationModelCache::new(),
        };
        let service = store.service();
        let pause = Arc::new(SyncPause::default());
        let ports = SyncPorts {
            identity: service.clone(),
            roles: service.clone(),
            credentials: service,
            files: Arc::new(FilesystemSyncStore::new()),
            pause: pause.clone(),
            clock: Arc::new(DefaultClock),
        };
        let layout = SyncLayout::new(settings.root(), settings.archive_root());
        let orchestrator = SyncOrchestrator::new(ports, &cache, layout);
        Ok(Self {
            store,
            pause,
            orchestrator,
            root: settings.root(),
        })
    }

    /// The orchestrator in use.
    pub const fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Export every user below the sync root.
    pub fn export(&self) -> Vec<SyncOutcome> {
        self.orchestrator.export_all(&self.root)
    }

    /// Import every document below the sync root and save the store.
    ///
    /// Save notifications are paused for the duration of the import.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when the updated store cannot be saved.
    pub fn import(&self, force: bool) -> Result<Vec<SyncOutcome>, AppError> {
        let outcomes = {
            let _paused = self.pause.pause_scope();
            self.orchestrator.import_all(&self.root, force)
        };
        self.store.persist()?;
        Ok(outcomes)
    }

    /// Report drift between the sync root and the store.
    pub fn report(&self) -> Vec<SyncOutcome> {
        self.orchestrator.report(&self.root)
    }
}

/// Generate the configured example users into the identity store, creating
/// it when absent, and export them.
///
/// Users whose e-mail address already exists are left untouched. Returns the
/// export outcomes of the users added.
///
/// # Errors
///
/// Returns [`AppError`] when the registry, the seed, or the store cannot be
/// used.
pub fn seed_store(settings: &SyncSettings) -> Result<Vec<SyncOutcome>, AppError> {
    let registry = SeedRegistry::from_file(&settings.registry_path())?;
    let seed = registry.find_seed(settings.seed_name())?;
    let generated = example_users::generate_example_users(&registry, seed)?;

    let path = utf8_path(settings.store())?;
    let store = match JsonIdentityStore::open(path.clone()) {
        Ok(store) => store,
        Err(JsonStoreError::Missing { .. }) => {
            JsonIdentityStore::create(path, shape_for(settings, &registry)?)
        }
        Err(error) => return Err(error.into()),
    };

    let service = store.service();
    let mut added = Vec::new();
    for seed_user in &generated {
        if service.find_by_email(&seed_user.email)?.is_some() {
            continue;
        }
        let record = record_from_seed(&service, seed_user);
        service.save(&record)?;
        added.push(record);
    }
    store.persist()?;
    info!(
        seed = settings.seed_name(),
        generated = generated.len(),
        added = added.len(),
        "seeded identity store"
    );

    let app = SyncApp::over_store(settings, store)?;
    Ok(app.orchestrator().on_saved(&added))
}

fn shape_for(
    settings: &SyncSettings,
    registry: &SeedRegistry,
) -> Result<OrganisationShape, AppError> {
    let aliases = registry.membership_aliases().to_vec();
    Ok(match settings.organisation_model()? {
        Some(OrganisationModel::MultiGroup) => OrganisationShape::UserGroups { groups: aliases },
        Some(OrganisationModel::NotImplemented) => OrganisationShape::Unsupported,
        Some(OrganisationModel::SingleSelect) | None => {
            OrganisationShape::UserTypes { types: aliases }
        }
    })
}

fn record_from_seed(service: &InMemoryIdentityService, seed: &ExampleUserSeed) -> UserRecord {
    let mut record = UserRecord::new(
        UserId::random(),
        seed.username.as_str(),
        seed.display_name.as_str(),
        seed.email.as_str(),
    );
    record.credential = hash_credential(&seed.credential);
    record.comments.clone_from(&seed.comments);
    record.approved = seed.approved;
    record.locked_out = seed.locked_out;
    record.failed_password_attempts = seed.failed_password_attempts;
    for section in &seed.sections {
        record.add_allowed_section(section);
    }
    record.membership = match service.shape() {
        OrganisationShape::UserTypes { .. } => seed
            .membership_aliases
            .first()
            .cloned()
            .map_or(Membership::Unassigned, Membership::Organisation),
        OrganisationShape::UserGroups { .. } => Membership::Groups(
            seed.membership_aliases
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>(),
        ),
        OrganisationShape::Unsupported => Membership::Unassigned,
    };
    record
}

/// Stand-in for the host's credential hashing.
fn hash_credential(plaintext: &str) -> String {
    format!("sha256${}", hex::encode(Sha256::digest(plaintext.as_bytes())))
}
