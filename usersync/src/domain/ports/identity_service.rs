//! Port abstraction for the identity service that owns user records.
//!
//! Identity services come in two organisation shapes. A service advertises
//! the shape it supports by returning a capability from
//! [`IdentityService::type_capability`] or
//! [`IdentityService::group_capability`]; a service exposing neither cannot
//! take part in synchronisation.

use crate::domain::{UserId, UserRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity service adapters.
    pub enum IdentityServiceError {
        /// The backing store could not be reached.
        Unavailable { message: String } => "identity service unavailable: {message}",
        /// A read or write against the backing store failed.
        Query { message: String } => "identity service query failed: {message}",
        /// Another record already uses this e-mail address.
        DuplicateEmail { email: String } => "a user with e-mail {email} already exists",
        /// No record carries the identifier.
        UnknownUser { id: String } => "no user with id {id}",
    }
}

/// One page of users together with the total number of users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPage {
    /// Users on this page.
    pub users: Vec<UserRecord>,
    /// Total users across all pages.
    pub total: usize,
}

/// Port for reading and persisting user records.
pub trait IdentityService: Send + Sync {
    /// Look up a user by e-mail address.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityServiceError>;

    /// Look up a user by identifier.
    fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, IdentityServiceError>;

    /// Persist every field of `user`, inserting it when the id is new.
    fn save(&self, user: &UserRecord) -> Result<(), IdentityServiceError>;

    /// Return the zero-based `page` of users, `page_size` users per page.
    fn list_users(&self, page: usize, page_size: usize)
    -> Result<UserPage, IdentityServiceError>;

    /// Single-select organisation operations, when supported.
    fn type_capability(&self) -> Option<&dyn UserTypeCapability> {
        None
    }

    /// Multi-group organisation operations, when supported.
    fn group_capability(&self) -> Option<&dyn UserGroupCapability> {
        None
    }
}

/// Operations of services where each user has exactly one user type.
#[cfg_attr(test, mockall::automock)]
pub trait UserTypeCapability: Send + Sync {
    /// Aliases of every user type.
    fn list_types(&self) -> Result<Vec<String>, IdentityServiceError>;

    /// Resolve a user type alias to its canonical spelling.
    fn find_type(&self, alias: &str) -> Result<Option<String>, IdentityServiceError>;

    /// Create and persist a user with the given user type.
    fn create_user_with_type(
        &self,
        username: &str,
        email: &str,
        user_type: &str,
    ) -> Result<UserRecord, IdentityServiceError>;
}

/// Operations of services where users belong to any number of groups.
#[cfg_attr(test, mockall::automock)]
pub trait UserGroupCapability: Send + Sync {
    /// Aliases of every group.
    fn list_groups(&self) -> Result<Vec<String>, IdentityServiceError>;

    /// Resolve a group alias to its canonical spelling.
    fn find_group(&self, alias: &str) -> Result<Option<String>, IdentityServiceError>;

    /// Create and persist a user without any group.
    fn create_user(&self, username: &str, email: &str) -> Result<UserRecord, IdentityServiceError>;
}
