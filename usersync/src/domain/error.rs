//! Errors raised while moving records between the identity service and the
//! file tree.

use thiserror::Error;

use super::credential::CredentialError;
use super::node::NodeError;
use super::ports::{
    CredentialStoreError, IdentityServiceError, RoleProviderError, SyncFileStoreError,
};

/// Broad failure categories reported in logs and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// A document lacks required attributes or holds unparseable values.
    MalformedNode,
    /// The identity service exposes no supported organisation shape.
    UnresolvableMembershipKind,
    /// The identity service, a store, or a file rejected a read or write.
    PersistenceFailure,
    /// A folder of the file tree could not be enumerated.
    FolderFailure,
}

/// Error raised for a single record or document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Required attribute missing from a document.
    #[error("document is missing required attribute {attribute}")]
    MissingAttribute {
        /// Attribute name.
        attribute: &'static str,
    },
    /// Element text could not be parsed into its field type.
    #[error("invalid {element} value '{value}': {message}")]
    InvalidField {
        /// Element name.
        element: &'static str,
        /// Offending text.
        value: String,
        /// Parser message.
        message: String,
    },
    /// The document itself could not be read or written.
    #[error(transparent)]
    Document(#[from] NodeError),
    /// The stored credential could not be revealed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The identity service exposes neither organisation shape.
    #[error("identity service exposes no supported organisation model")]
    UnresolvableMembershipKind,
    /// A new user could not be created with the requested membership.
    #[error("could not create user {email} with membership '{membership}'")]
    UserCreation {
        /// E-mail address of the user.
        email: String,
        /// Requested membership.
        membership: String,
    },
    /// The requested membership names no known user type.
    #[error("membership '{membership}' is not known to the identity service")]
    UnknownMembership {
        /// Requested membership.
        membership: String,
    },
    /// The identity service failed.
    #[error(transparent)]
    Identity(#[from] IdentityServiceError),
    /// Role lookup failed.
    #[error(transparent)]
    Roles(#[from] RoleProviderError),
    /// Raw credential access failed.
    #[error(transparent)]
    CredentialStore(#[from] CredentialStoreError),
    /// The file tree failed.
    #[error(transparent)]
    Files(#[from] SyncFileStoreError),
}

impl SyncError {
    /// Category used when reporting this error.
    pub const fn kind(&self) -> SyncErrorKind {
        match self {
            Self::MissingAttribute { .. }
            | Self::InvalidField { .. }
            | Self::Document(_)
            | Self::Credential(_) => SyncErrorKind::MalformedNode,
            Self::UnresolvableMembershipKind => SyncErrorKind::UnresolvableMembershipKind,
            Self::UserCreation { .. }
            | Self::UnknownMembership { .. }
            | Self::Identity(_)
            | Self::Roles(_)
            | Self::CredentialStore(_)
            | Self::Files(
                SyncFileStoreError::Read { .. }
                | SyncFileStoreError::Write { .. }
                | SyncFileStoreError::Archive { .. },
            ) => SyncErrorKind::PersistenceFailure,
            Self::Files(SyncFileStoreError::List { .. }) => SyncErrorKind::FolderFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SyncError::MissingAttribute { attribute: "Email" }, SyncErrorKind::MalformedNode)]
    #[case(
        SyncError::InvalidField {
            element: "IsApproved",
            value: "maybe".to_owned(),
            message: "not a boolean".to_owned(),
        },
        SyncErrorKind::MalformedNode
    )]
    #[case(SyncError::Credential(CredentialError::KeyMismatch), SyncErrorKind::MalformedNode)]
    #[case(SyncError::UnresolvableMembershipKind, SyncErrorKind::UnresolvableMembershipKind)]
    #[case(
        SyncError::Identity(IdentityServiceError::query("boom")),
        SyncErrorKind::PersistenceFailure
    )]
    #[case(
        SyncError::Files(SyncFileStoreError::write("User/a.config", "denied")),
        SyncErrorKind::PersistenceFailure
    )]
    #[case(
        SyncError::Files(SyncFileStoreError::list("User", "denied")),
        SyncErrorKind::FolderFailure
    )]
    fn classifies_errors(#[case] error: SyncError, #[case] expected: SyncErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn messages_name_the_offending_value() {
        let error = SyncError::InvalidField {
            element: "FailedPasswordAttempts",
            value: "many".to_owned(),
            message: "invalid digit found in string".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "invalid FailedPasswordAttempts value 'many': invalid digit found in string"
        );
    }
}
