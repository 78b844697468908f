//! Bulk export, import, and drift reporting over the file tree.
//!
//! Every entry point returns one [`SyncOutcome`] per record or document and
//! never fails as a whole: a record that cannot be written, a file that
//! cannot be parsed, or a folder that cannot be listed is logged and
//! reported, and processing continues with the next entry.

use std::path::Path;
use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info, warn};

use super::comparator::{Comparator, Comparison};
use super::error::{SyncError, SyncErrorKind};
use super::layout::{SyncLayout, is_sync_file};
use super::node::CanonicalNode;
use super::organisation::{
    OrganisationAdapter, OrganisationModel, OrganisationModelCache, organisation_adapter,
};
use super::outcome::{ChangeKind, OutcomeSummary, SyncOutcome};
use super::ports::{
    CredentialStore, IdentityService, PauseFlag, RoleProvider, SyncFileStore,
};
use super::serializer::{ImportDisposition, RecordSerializer, USER_NODE};
use super::user::UserRecord;

/// Collaborators driven by a [`SyncOrchestrator`].
#[derive(Clone)]
pub struct SyncPorts {
    /// Live identity service.
    pub identity: Arc<dyn IdentityService>,
    /// Role lookup for exported documents.
    pub roles: Arc<dyn RoleProvider>,
    /// Raw credential access for post-save verification.
    pub credentials: Arc<dyn CredentialStore>,
    /// File tree holding the documents.
    pub files: Arc<dyn SyncFileStore>,
    /// Suppresses save and delete notifications while set.
    pub pause: Arc<dyn PauseFlag>,
    /// Source of archive timestamps.
    pub clock: Arc<dyn Clock>,
}

/// Drives export, import, and reporting between the identity service and
/// the file tree.
#[derive(Clone)]
pub struct SyncOrchestrator {
    organisation: Arc<dyn OrganisationAdapter>,
    serializer: RecordSerializer,
    comparator: Comparator,
    files: Arc<dyn SyncFileStore>,
    pause: Arc<dyn PauseFlag>,
    clock: Arc<dyn Clock>,
    layout: SyncLayout,
}

/// What to do with each document found during a folder walk.
#[derive(Debug, Clone, Copy)]
enum Visit {
    Import { force: bool },
    Report,
}

impl Visit {
    const fn change(self) -> ChangeKind {
        match self {
            Self::Import { .. } => ChangeKind::Import,
            Self::Report => ChangeKind::Report,
        }
    }
}

impl SyncOrchestrator {
    /// Build an orchestrator, resolving the organisation model through
    /// `cache`.
    pub fn new(ports: SyncPorts, cache: &OrganisationModelCache, layout: SyncLayout) -> Self {
        let organisation = organisation_adapter(ports.identity.clone(), cache);
        let serializer = RecordSerializer::new(
            ports.identity.clone(),
            organisation.clone(),
            ports.roles,
            ports.credentials,
        );
        let comparator = Comparator::new(ports.identity, serializer.clone());
        Self {
            organisation,
            serializer,
            comparator,
            files: ports.files,
            pause: ports.pause,
            clock: ports.clock,
            layout,
        }
    }

    /// Organisation model in effect.
    pub fn model(&self) -> OrganisationModel {
        self.organisation.model()
    }

    /// Sync and archive roots used by the notification handlers.
    pub const fn layout(&self) -> &SyncLayout {
        &self.layout
    }

    /// Write a document for every live user below `root`, overwriting
    /// earlier exports.
    pub fn export_all(&self, root: &Path) -> Vec<SyncOutcome> {
        let users = match self.organisation.all_users() {
            Ok(users) => users,
            Err(error) => {
                warn!(
                    error = %error,
                    kind = ?SyncErrorKind::PersistenceFailure,
                    "could not enumerate users for export"
                );
                return Vec::new();
            }
        };
        let outcomes: Vec<_> = users.iter().map(|user| self.export_one(root, user)).collect();
        log_summary("export", &outcomes);
        outcomes
    }

    /// Apply every document below `folder` to the identity service.
    ///
    /// Documents skipped because the organisation model is unresolved
    /// produce no outcome. `force` is passed through to the serializer.
    pub fn import_all(&self, folder: &Path, force: bool) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        self.visit_folder(folder, Visit::Import { force }, &mut outcomes);
        log_summary("import", &outcomes);
        outcomes
    }

    /// Compare every document below `folder` with the identity service.
    ///
    /// An outcome succeeds when importing its document would change the
    /// service. Documents that cannot be judged fail with the reason.
    pub fn report(&self, folder: &Path) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        self.visit_folder(folder, Visit::Report, &mut outcomes);
        log_summary("report", &outcomes);
        outcomes
    }

    /// Export each saved record below the sync root unless paused.
    pub fn on_saved(&self, records: &[UserRecord]) -> Vec<SyncOutcome> {
        if self.pause.is_paused() {
            debug!(records = records.len(), "sync paused; ignoring saved records");
            return Vec::new();
        }
        let root = self.layout.root();
        records
            .iter()
            .map(|record| self.export_one(root, record))
            .collect()
    }

    /// Move each deleted record's document into the archive unless paused.
    pub fn on_deleted(&self, records: &[UserRecord]) -> Vec<SyncOutcome> {
        if self.pause.is_paused() {
            debug!(records = records.len(), "sync paused; ignoring deleted records");
            return Vec::new();
        }
        let stamp = self.clock.utc();
        records
            .iter()
            .map(|record| {
                let path = SyncLayout::file_for(self.layout.root(), &record.email);
                let archive_path = self.layout.archive_file_for(&record.email, stamp);
                match self.files.archive_file(&path, &archive_path) {
                    Ok(true) => {
                        SyncOutcome::succeeded(&record.email, ChangeKind::Export, &archive_path)
                    }
                    Ok(false) => SyncOutcome::succeeded(&record.email, ChangeKind::Export, &path)
                        .with_message("no export file to archive"),
                    Err(error) => failed_outcome(
                        &record.email,
                        ChangeKind::Export,
                        &path,
                        &SyncError::from(error),
                    ),
                }
            })
            .collect()
    }

    fn export_one(&self, root: &Path, user: &UserRecord) -> SyncOutcome {
        let path = SyncLayout::file_for(root, &user.email);
        let written = self
            .serializer
            .serialize(user)
            .and_then(|node| node.to_xml().map_err(SyncError::from))
            .and_then(|xml| {
                self.files
                    .write_file(&path, &xml)
                    .map_err(SyncError::from)
            });
        match written {
            Ok(()) => SyncOutcome::succeeded(&user.email, ChangeKind::Export, &path),
            Err(error) => failed_outcome(&user.email, ChangeKind::Export, &path, &error),
        }
    }

    fn visit_folder(&self, folder: &Path, visit: Visit, outcomes: &mut Vec<SyncOutcome>) {
        let listing = match self.files.list_folder(folder) {
            Ok(listing) => listing,
            Err(error) => {
                warn!(
                    path = %folder.display(),
                    error = %error,
                    kind = ?SyncErrorKind::FolderFailure,
                    "could not list sync folder"
                );
                return;
            }
        };
        for file in listing.files.iter().filter(|file| is_sync_file(file)) {
            self.visit_file(file, visit, outcomes);
        }
        for child in &listing.folders {
            self.visit_folder(child, visit, outcomes);
        }
    }

    fn visit_file(&self, path: &Path, visit: Visit, outcomes: &mut Vec<SyncOutcome>) {
        let key = path.display().to_string();
        let nodes = self
            .files
            .read_file(path)
            .map_err(SyncError::from)
            .and_then(|xml| CanonicalNode::parse_document(&xml).map_err(SyncError::from));
        let nodes = match nodes {
            Ok(nodes) => nodes,
            Err(error) => {
                outcomes.push(failed_outcome(&key, visit.change(), path, &error));
                return;
            }
        };
        for node in nodes.iter().filter(|node| node.name() == USER_NODE) {
            let outcome = match visit {
                Visit::Import { force } => self.import_node(node, path, force),
                Visit::Report => Some(self.report_node(node, path)),
            };
            outcomes.extend(outcome);
        }
    }

    fn import_node(&self, node: &CanonicalNode, path: &Path, force: bool) -> Option<SyncOutcome> {
        let key = node_key(node, path);
        match self.serializer.deserialize(node, force) {
            Ok(ImportDisposition::Applied(record)) => Some(SyncOutcome::succeeded(
                record.email,
                ChangeKind::Import,
                path,
            )),
            Ok(ImportDisposition::Indeterminate) => None,
            Err(error) => Some(failed_outcome(&key, ChangeKind::Import, path, &error)),
        }
    }

    fn report_node(&self, node: &CanonicalNode, path: &Path) -> SyncOutcome {
        let key = node_key(node, path);
        match self.comparator.compare(node) {
            Ok(Comparison::Drifted) => SyncOutcome::succeeded(key, ChangeKind::Report, path),
            Ok(Comparison::InSync) => SyncOutcome {
                success: false,
                ..SyncOutcome::succeeded(key, ChangeKind::Report, path)
            },
            Ok(Comparison::Indeterminate(reason)) => {
                debug!(path = %path.display(), reason = %reason, "document cannot be compared");
                SyncOutcome::failed(key, ChangeKind::Report, path, reason.to_string())
            }
            Err(error) => failed_outcome(&key, ChangeKind::Report, path, &error),
        }
    }
}

fn node_key(node: &CanonicalNode, path: &Path) -> String {
    node.attribute("Email")
        .filter(|email| !email.trim().is_empty())
        .map_or_else(|| path.display().to_string(), |email| email.trim().to_owned())
}

fn failed_outcome(key: &str, change: ChangeKind, path: &Path, error: &SyncError) -> SyncOutcome {
    warn!(
        key,
        path = %path.display(),
        error = %error,
        kind = ?error.kind(),
        "record synchronisation failed"
    );
    SyncOutcome::failed(key, change, path, error.to_string())
}

fn log_summary(operation: &'static str, outcomes: &[SyncOutcome]) {
    let summary = OutcomeSummary::of(outcomes);
    info!(
        operation,
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "synchronisation run finished"
    );
}
