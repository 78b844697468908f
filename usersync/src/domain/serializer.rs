//! Mapping between [`UserRecord`]s and their canonical documents.
//!
//! A user document looks like this:
//!
//! ```xml
//! <User Email="ada@example.org" Organisation="editor" Name="Ada Lovelace" User="ada">
//!   <Comments>Prefers analytical engines</Comments>
//!   <FailedPasswordAttempts>0</FailedPasswordAttempts>
//!   <IsApproved>true</IsApproved>
//!   <IsLockedOut>false</IsLockedOut>
//!   <LastLockedOutDate />
//!   <LastLoginDate>2026-03-14T09:26:53Z</LastLoginDate>
//!   <LastPasswordChangeDate />
//!   <Groups>
//!     <Group>reviewer</Group>
//!   </Groups>
//!   <Password>q83vEjRWeJA=</Password>
//!   <SecurityStamp>5f2b</SecurityStamp>
//!   <Sections>content,media</Sections>
//! </User>
//! ```
//!
//! `PasswordQuestion` and `RawPasswordAnswer` appear only when set, and
//! `Groups` only when the user holds roles.
//!
//! Older documents carry the membership in a `Type` attribute instead of
//! `Organisation`; both are read.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use super::credential::{CredentialObfuscator, credential_fingerprint};
use super::error::SyncError;
use super::node::CanonicalNode;
use super::organisation::{OrganisationAdapter, OrganisationModel};
use super::ports::{CredentialStore, IdentityService, RoleProvider};
use super::user::{GROUP_SEPARATOR, SECTION_SEPARATOR, UserRecord, split_aliases};

/// Name of the root element of a user document.
pub const USER_NODE: &str = "User";

const ATTR_EMAIL: &str = "Email";
const ATTR_ORGANISATION: &str = "Organisation";
const ATTR_LEGACY_TYPE: &str = "Type";
const ATTR_NAME: &str = "Name";
const ATTR_USERNAME: &str = "User";

const COMMENTS: &str = "Comments";
const FAILED_PASSWORD_ATTEMPTS: &str = "FailedPasswordAttempts";
const GROUPS: &str = "Groups";
const GROUP: &str = "Group";
const IS_APPROVED: &str = "IsApproved";
const IS_LOCKED_OUT: &str = "IsLockedOut";
const LAST_LOCKED_OUT_DATE: &str = "LastLockedOutDate";
const LAST_LOGIN_DATE: &str = "LastLoginDate";
const LAST_PASSWORD_CHANGE_DATE: &str = "LastPasswordChangeDate";
const PASSWORD_QUESTION: &str = "PasswordQuestion";
const PASSWORD: &str = "Password";
const RAW_PASSWORD_ANSWER: &str = "RawPasswordAnswer";
const SECURITY_STAMP: &str = "SecurityStamp";
const SECTIONS: &str = "Sections";

/// Identity attributes every user document must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKeys {
    /// `Email` attribute.
    pub email: String,
    /// `Organisation` attribute, or the legacy `Type` attribute.
    pub membership: String,
    /// `Name` attribute.
    pub display_name: String,
    /// `User` attribute.
    pub username: String,
}

impl NodeKeys {
    /// Read the identity attributes of a user document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingAttribute`] for the first absent
    /// attribute; an empty `Email` counts as absent.
    pub fn read(node: &CanonicalNode) -> Result<Self, SyncError> {
        let email = node
            .attribute(ATTR_EMAIL)
            .filter(|email| !email.trim().is_empty())
            .ok_or(SyncError::MissingAttribute {
                attribute: ATTR_EMAIL,
            })?;
        let membership = node
            .attribute(ATTR_ORGANISATION)
            .or_else(|| node.attribute(ATTR_LEGACY_TYPE))
            .ok_or(SyncError::MissingAttribute {
                attribute: ATTR_ORGANISATION,
            })?;
        let display_name = required(node, ATTR_NAME)?;
        let username = required(node, ATTR_USERNAME)?;
        Ok(Self {
            email: email.trim().to_owned(),
            membership: membership.trim().to_owned(),
            display_name: display_name.to_owned(),
            username: username.to_owned(),
        })
    }
}

fn required<'a>(node: &'a CanonicalNode, attribute: &'static str) -> Result<&'a str, SyncError> {
    node.attribute(attribute)
        .ok_or(SyncError::MissingAttribute { attribute })
}

/// Comparison form of a user document: legacy `Type` renamed to
/// `Organisation`, aliases sorted and deduplicated, then
/// [`CanonicalNode::normalized`].
pub fn canonical_form(node: &CanonicalNode) -> CanonicalNode {
    let mut renamed = node.clone();
    if renamed.attribute(ATTR_ORGANISATION).is_none() {
        if let Some(legacy) = renamed.remove_attribute(ATTR_LEGACY_TYPE) {
            renamed.set_attribute(ATTR_ORGANISATION, legacy);
        }
    }
    if let Some(membership) = renamed.attribute(ATTR_ORGANISATION) {
        let aliases: BTreeSet<_> = split_aliases(membership).collect();
        let joined = aliases
            .into_iter()
            .collect::<Vec<_>>()
            .join(&GROUP_SEPARATOR.to_string());
        renamed.set_attribute(ATTR_ORGANISATION, joined);
    }
    renamed.normalized()
}

/// Result of applying a document to the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDisposition {
    /// The document was applied and the record saved.
    Applied(Box<UserRecord>),
    /// The organisation model is unresolved; nothing was touched.
    Indeterminate,
}

/// Converts records to documents and applies documents to the service.
#[derive(Clone)]
pub struct RecordSerializer {
    identity: Arc<dyn IdentityService>,
    organisation: Arc<dyn OrganisationAdapter>,
    roles: Arc<dyn RoleProvider>,
    credentials: Arc<dyn CredentialStore>,
}

impl RecordSerializer {
    /// Build a serializer over the given collaborators.
    pub fn new(
        identity: Arc<dyn IdentityService>,
        organisation: Arc<dyn OrganisationAdapter>,
        roles: Arc<dyn RoleProvider>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            identity,
            organisation,
            roles,
            credentials,
        }
    }

    /// Organisation model the serializer works against.
    pub fn model(&self) -> OrganisationModel {
        self.organisation.model()
    }

    /// Produce the document for `record`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnresolvableMembershipKind`] when the service has
    /// no supported organisation shape, or [`SyncError::Roles`] when role
    /// lookup fails.
    pub fn serialize(&self, record: &UserRecord) -> Result<CanonicalNode, SyncError> {
        if self.model() == OrganisationModel::NotImplemented {
            return Err(SyncError::UnresolvableMembershipKind);
        }

        let roles = self.roles.roles_for_user(&record.username)?;
        let obfuscator = CredentialObfuscator::for_identity(&record.email, &record.display_name);

        let mut node = CanonicalNode::element(USER_NODE)
            .with_attribute(ATTR_EMAIL, record.email.as_str())
            .with_attribute(ATTR_ORGANISATION, self.organisation.membership(record))
            .with_attribute(ATTR_NAME, record.display_name.as_str())
            .with_attribute(ATTR_USERNAME, record.username.as_str())
            .with_text_child(COMMENTS, record.comments.as_str())
            .with_text_child(
                FAILED_PASSWORD_ATTEMPTS,
                record.failed_password_attempts.to_string(),
            )
            .with_text_child(IS_APPROVED, record.approved.to_string())
            .with_text_child(IS_LOCKED_OUT, record.locked_out.to_string())
            .with_text_child(LAST_LOCKED_OUT_DATE, format_timestamp(record.last_lockout_at))
            .with_text_child(LAST_LOGIN_DATE, format_timestamp(record.last_login_at))
            .with_text_child(
                LAST_PASSWORD_CHANGE_DATE,
                format_timestamp(record.last_password_change_at),
            );
        if !record.password_question.trim().is_empty() {
            node = node.with_text_child(PASSWORD_QUESTION, record.password_question.as_str());
        }
        if !record.password_answer.trim().is_empty() {
            node = node.with_text_child(RAW_PASSWORD_ANSWER, record.password_answer.as_str());
        }
        if !roles.is_empty() {
            node = node.with_child(
                roles
                    .into_iter()
                    .fold(CanonicalNode::element(GROUPS), |groups, role| {
                        groups.with_text_child(GROUP, role)
                    }),
            );
        }
        Ok(node
            .with_text_child(PASSWORD, obfuscator.obfuscate(&record.credential))
            .with_text_child(SECURITY_STAMP, record.security_stamp.as_str())
            .with_text_child(
                SECTIONS,
                record.allowed_sections.join(&SECTION_SEPARATOR.to_string()),
            ))
    }

    /// Apply `node` to the identity service.
    ///
    /// The user is looked up by e-mail and created with the document's
    /// membership when absent. Fields present in the document overwrite the
    /// record, sections are granted additively, and the record is saved.
    /// When the document carries a credential, the stored value is read back
    /// and corrected if the save did not preserve it. `force` is accepted
    /// for interface compatibility; every document is applied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the document is malformed, the user cannot
    /// be created, the membership is unknown, or the service fails.
    pub fn deserialize(
        &self,
        node: &CanonicalNode,
        force: bool,
    ) -> Result<ImportDisposition, SyncError> {
        let keys = NodeKeys::read(node)?;
        if self.model() == OrganisationModel::NotImplemented {
            debug!(email = %keys.email, "organisation model unresolved; skipping document");
            return Ok(ImportDisposition::Indeterminate);
        }
        debug!(email = %keys.email, force, "applying user document");

        let fields = DocumentFields::read(node)?;
        let credential = fields
            .password
            .as_deref()
            .map(|hidden| {
                CredentialObfuscator::for_identity(&keys.email, &keys.display_name).reveal(hidden)
            })
            .transpose()?
            .filter(|credential| !credential.is_empty());

        let mut record = self.find_or_create(&keys)?;
        keys.display_name.clone_into(&mut record.display_name);
        keys.username.clone_into(&mut record.username);

        if self.organisation.membership(&record) != keys.membership
            && !self
                .organisation
                .set_membership(&mut record, &keys.membership)?
        {
            return Err(SyncError::UnknownMembership {
                membership: keys.membership,
            });
        }

        fields.apply(&mut record, credential.as_deref());

        self.identity.save(&record)?;
        if let Some(expected) = credential.as_deref() {
            self.verify_credential(&record, expected)?;
        }
        Ok(ImportDisposition::Applied(Box::new(record)))
    }

    fn find_or_create(&self, keys: &NodeKeys) -> Result<UserRecord, SyncError> {
        if let Some(existing) = self.identity.find_by_email(&keys.email)? {
            return Ok(existing);
        }
        debug!(email = %keys.email, membership = %keys.membership, "creating user");
        self.organisation
            .create_user(&keys.username, &keys.email, &keys.membership)?
            .ok_or_else(|| SyncError::UserCreation {
                email: keys.email.clone(),
                membership: keys.membership.clone(),
            })
    }

    fn verify_credential(&self, record: &UserRecord, expected: &str) -> Result<(), SyncError> {
        let stored = self.credentials.read_credential(&record.id)?;
        if stored.as_deref() == Some(expected) {
            return Ok(());
        }
        warn!(
            email = %record.email,
            stored = %credential_fingerprint(stored.as_deref().unwrap_or_default()),
            expected = %credential_fingerprint(expected),
            "stored credential differs after save; rewriting"
        );
        self.credentials.write_credential(&record.id, expected)?;
        Ok(())
    }
}

/// Child element values of a user document, parsed before any mutation.
#[derive(Debug, Default)]
struct DocumentFields {
    comments: Option<String>,
    failed_password_attempts: Option<u32>,
    approved: Option<bool>,
    locked_out: Option<bool>,
    last_lockout_at: Option<Option<DateTime<Utc>>>,
    last_login_at: Option<Option<DateTime<Utc>>>,
    last_password_change_at: Option<Option<DateTime<Utc>>>,
    password_question: Option<String>,
    password: Option<String>,
    password_answer: Option<String>,
    security_stamp: Option<String>,
    sections: Vec<String>,
}

impl DocumentFields {
    fn read(node: &CanonicalNode) -> Result<Self, SyncError> {
        let mut fields = Self::default();
        for child in node.children() {
            let verbatim = child.text();
            let text = verbatim.trim();
            match child.name() {
                COMMENTS => fields.comments = Some(verbatim.to_owned()),
                FAILED_PASSWORD_ATTEMPTS => {
                    fields.failed_password_attempts = Some(parse_count(text)?);
                }
                GROUPS => {
                    debug!(
                        roles = child.children().len(),
                        "role grants in document are not applied"
                    );
                }
                IS_APPROVED => fields.approved = Some(parse_flag(IS_APPROVED, text)?),
                IS_LOCKED_OUT => fields.locked_out = Some(parse_flag(IS_LOCKED_OUT, text)?),
                LAST_LOCKED_OUT_DATE => {
                    fields.last_lockout_at = Some(parse_timestamp(LAST_LOCKED_OUT_DATE, text)?);
                }
                LAST_LOGIN_DATE => {
                    fields.last_login_at = Some(parse_timestamp(LAST_LOGIN_DATE, text)?);
                }
                LAST_PASSWORD_CHANGE_DATE => {
                    fields.last_password_change_at =
                        Some(parse_timestamp(LAST_PASSWORD_CHANGE_DATE, text)?);
                }
                PASSWORD_QUESTION => fields.password_question = Some(verbatim.to_owned()),
                PASSWORD => fields.password = Some(text.to_owned()),
                RAW_PASSWORD_ANSWER => fields.password_answer = Some(verbatim.to_owned()),
                SECURITY_STAMP => fields.security_stamp = Some(verbatim.to_owned()),
                SECTIONS => {
                    fields.sections = text
                        .split(SECTION_SEPARATOR)
                        .map(str::trim)
                        .filter(|section| !section.is_empty())
                        .map(str::to_owned)
                        .collect();
                }
                other => debug!(element = other, "ignoring unknown element"),
            }
        }
        Ok(fields)
    }

    fn apply(self, record: &mut UserRecord, credential: Option<&str>) {
        if let Some(comments) = self.comments {
            record.comments = comments;
        }
        if let Some(attempts) = self.failed_password_attempts {
            record.failed_password_attempts = attempts;
        }
        if let Some(approved) = self.approved {
            record.approved = approved;
        }
        if let Some(locked_out) = self.locked_out {
            record.locked_out = locked_out;
        }
        if let Some(at) = self.last_lockout_at {
            record.last_lockout_at = at;
        }
        if let Some(at) = self.last_login_at {
            record.last_login_at = at;
        }
        if let Some(at) = self.last_password_change_at {
            record.last_password_change_at = at;
        }
        if let Some(question) = self.password_question {
            record.password_question = question;
        }
        if let Some(answer) = self.password_answer {
            record.password_answer = answer;
        }
        if let Some(stamp) = self.security_stamp {
            record.security_stamp = stamp;
        }
        if let Some(credential) = credential {
            credential.clone_into(&mut record.credential);
        }
        for section in &self.sections {
            record.add_allowed_section(section);
        }
    }
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|value| value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn parse_timestamp(
    element: &'static str,
    text: &str,
) -> Result<Option<DateTime<Utc>>, SyncError> {
    if text.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|value| Some(value.with_timezone(&Utc)))
        .map_err(|error| SyncError::InvalidField {
            element,
            value: text.to_owned(),
            message: error.to_string(),
        })
}

fn parse_flag(element: &'static str, text: &str) -> Result<bool, SyncError> {
    match text.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SyncError::InvalidField {
            element,
            value: text.to_owned(),
            message: "expected true or false".to_owned(),
        }),
    }
}

fn parse_count(text: &str) -> Result<u32, SyncError> {
    text.parse().map_err(|error: std::num::ParseIntError| SyncError::InvalidField {
        element: FAILED_PASSWORD_ATTEMPTS,
        value: text.to_owned(),
        message: error.to_string(),
    })
}
