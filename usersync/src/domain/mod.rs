//! Synchronisation domain: records, documents, and the engine driving them.
//!
//! Purpose: map identity-service users to canonical documents and back,
//! detect drift, and walk the file tree in bulk. Everything here talks to
//! the outside world through [`ports`]; adapters live in
//! [`crate::outbound`].
//!
//! Public surface:
//! - [`UserRecord`] and [`Membership`]: the synchronisation unit.
//! - [`CanonicalNode`]: the document tree written to disk.
//! - [`CredentialObfuscator`]: reversible credential masking.
//! - [`OrganisationAdapter`]: one interface over both membership shapes.
//! - [`RecordSerializer`] and [`Comparator`]: import, export, and drift.
//! - [`SyncOrchestrator`]: bulk runs and save/delete notifications.

pub mod comparator;
pub mod credential;
pub mod error;
pub mod layout;
pub mod node;
pub mod orchestrator;
pub mod organisation;
pub mod outcome;
pub mod ports;
pub mod serializer;
pub mod user;

pub use self::comparator::{Comparator, Comparison};
pub use self::credential::{CredentialError, CredentialObfuscator, credential_fingerprint};
pub use self::error::{SyncError, SyncErrorKind};
pub use self::layout::{
    FILE_EXTENSION, SYNC_FOLDER_NAME, SyncLayout, is_sync_file, safe_file_stem,
};
pub use self::node::{CanonicalNode, NodeError};
pub use self::orchestrator::{SyncOrchestrator, SyncPorts};
pub use self::organisation::{
    MultiGroupOrganisation, OrganisationAdapter, OrganisationModel, OrganisationModelCache,
    SingleSelectOrganisation, UnknownOrganisationModel, UnsupportedOrganisation,
    detect_organisation_model, organisation_adapter,
};
pub use self::outcome::{ChangeKind, OutcomeSummary, SyncOutcome};
pub use self::serializer::{
    ImportDisposition, NodeKeys, RecordSerializer, USER_NODE, canonical_form,
};
pub use self::user::{GROUP_SEPARATOR, Membership, SECTION_SEPARATOR, UserId, UserRecord};
