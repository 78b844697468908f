//! User records as held by the identity service.
//!
//! A [`UserRecord`] carries the subset of identity state that is mirrored to
//! disk. Membership is modelled as a [`Membership`] so both organisation
//! shapes an identity service may expose share one record type.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator between group aliases in a membership string.
pub const GROUP_SEPARATOR: char = '.';

/// Separator between section names in an allowed-sections string.
pub const SECTION_SEPARATOR: char = ',';

/// Opaque identifier assigned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier issued by the identity service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a user belongs to an organisation.
///
/// Single-select services assign exactly one organisation alias; multi-group
/// services assign a set of group aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "aliases", rename_all = "camelCase")]
pub enum Membership {
    /// No organisation assigned yet.
    #[default]
    Unassigned,
    /// Exactly one organisation alias.
    Organisation(String),
    /// Zero or more group aliases.
    Groups(BTreeSet<String>),
}

impl Membership {
    /// Render the membership as the single string stored in a document.
    ///
    /// Groups are joined with [`GROUP_SEPARATOR`] in alias order.
    ///
    /// # Examples
    /// ```
    /// use usersync::domain::Membership;
    ///
    /// let groups = Membership::Groups(["writer".to_owned(), "admin".to_owned()].into());
    /// assert_eq!(groups.to_wire(), "admin.writer");
    /// assert_eq!(Membership::Unassigned.to_wire(), "");
    /// ```
    pub fn to_wire(&self) -> String {
        match self {
            Self::Unassigned => String::new(),
            Self::Organisation(alias) => alias.clone(),
            Self::Groups(aliases) => aliases
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(&GROUP_SEPARATOR.to_string()),
        }
    }
}

/// Split a membership string into its non-empty aliases.
pub fn split_aliases(membership: &str) -> impl Iterator<Item = &str> {
    membership
        .split(GROUP_SEPARATOR)
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
}

/// A user record exposed by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identifier issued by the identity service.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Human-readable name.
    pub display_name: String,
    /// Unique e-mail address; the identity key across environments.
    pub email: String,
    /// Stored credential as held by the identity service.
    #[serde(default)]
    pub credential: String,
    /// Administrator comments.
    #[serde(default)]
    pub comments: String,
    /// Consecutive failed password attempts.
    #[serde(default)]
    pub failed_password_attempts: u32,
    /// Whether the account has been approved.
    #[serde(default)]
    pub approved: bool,
    /// Whether the account is locked out.
    #[serde(default)]
    pub locked_out: bool,
    /// When the account was last locked out.
    #[serde(default)]
    pub last_lockout_at: Option<DateTime<Utc>>,
    /// When the user last logged in.
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the credential last changed.
    #[serde(default)]
    pub last_password_change_at: Option<DateTime<Utc>>,
    /// Password recovery question.
    #[serde(default)]
    pub password_question: String,
    /// Answer to the recovery question.
    #[serde(default)]
    pub password_answer: String,
    /// Token invalidated whenever credentials change.
    #[serde(default)]
    pub security_stamp: String,
    /// Sections the user may open, in grant order.
    #[serde(default)]
    pub allowed_sections: Vec<String>,
    /// Organisation membership.
    #[serde(default)]
    pub membership: Membership,
}

impl UserRecord {
    /// Build an approved record with only identity fields set.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: display_name.into(),
            email: email.into(),
            credential: String::new(),
            comments: String::new(),
            failed_password_attempts: 0,
            approved: true,
            locked_out: false,
            last_lockout_at: None,
            last_login_at: None,
            last_password_change_at: None,
            password_question: String::new(),
            password_answer: String::new(),
            security_stamp: String::new(),
            allowed_sections: Vec::new(),
            membership: Membership::Unassigned,
        }
    }

    /// Grant a section unless it is already allowed.
    ///
    /// Returns `true` when the section was added.
    pub fn add_allowed_section(&mut self, section: &str) -> bool {
        if section.is_empty() || self.allowed_sections.iter().any(|s| s == section) {
            return false;
        }
        self.allowed_sections.push(section.to_owned());
        true
    }
}
