//! Drift detection between documents and live records.

use std::sync::Arc;

use super::error::SyncError;
use super::node::CanonicalNode;
use super::organisation::OrganisationModel;
use super::ports::IdentityService;
use super::serializer::{NodeKeys, RecordSerializer, canonical_form};

/// Verdict for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// The document matches the live record.
    InSync,
    /// Importing the document would change the identity service.
    Drifted,
    /// The document cannot be judged.
    Indeterminate(SyncError),
}

impl Comparison {
    /// Whether an import would change the identity service.
    pub const fn is_drifted(&self) -> bool {
        matches!(self, Self::Drifted)
    }
}

/// Compares documents with a fresh export of the matching live record.
#[derive(Clone)]
pub struct Comparator {
    identity: Arc<dyn IdentityService>,
    serializer: RecordSerializer,
}

impl Comparator {
    /// Build a comparator over `identity`, exporting through `serializer`.
    pub fn new(identity: Arc<dyn IdentityService>, serializer: RecordSerializer) -> Self {
        Self {
            identity,
            serializer,
        }
    }

    /// Compare `node` with the live record sharing its e-mail address.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the identity service or role lookup fails.
    /// Documents that cannot be judged yield [`Comparison::Indeterminate`].
    pub fn compare(&self, node: &CanonicalNode) -> Result<Comparison, SyncError> {
        let keys = match NodeKeys::read(node) {
            Ok(keys) => keys,
            Err(error) => return Ok(Comparison::Indeterminate(error)),
        };
        if self.serializer.model() == OrganisationModel::NotImplemented {
            return Ok(Comparison::Indeterminate(
                SyncError::UnresolvableMembershipKind,
            ));
        }

        let Some(live) = self.identity.find_by_email(&keys.email)? else {
            return Ok(Comparison::Drifted);
        };
        if live.display_name != keys.display_name || live.username != keys.username {
            return Ok(Comparison::Drifted);
        }

        let exported = self.serializer.serialize(&live)?;
        if canonical_form(&exported) == canonical_form(node) {
            Ok(Comparison::InSync)
        } else {
            Ok(Comparison::Drifted)
        }
    }
}
