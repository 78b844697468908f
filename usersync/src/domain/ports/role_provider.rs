//! Port abstraction for looking up the roles granted to a user.

use super::define_port_error;

define_port_error! {
    /// Errors raised by role provider adapters.
    pub enum RoleProviderError {
        /// Role lookup failed.
        Lookup { username: String, message: String } =>
            "role lookup for {username} failed: {message}",
    }
}

/// Port for listing the roles held by a user.
#[cfg_attr(test, mockall::automock)]
pub trait RoleProvider: Send + Sync {
    /// Roles granted to `username`, in provider order.
    fn roles_for_user(&self, username: &str) -> Result<Vec<String>, RoleProviderError>;
}

/// Role provider for hosts without role support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoles;

impl RoleProvider for NoRoles {
    fn roles_for_user(&self, _username: &str) -> Result<Vec<String>, RoleProviderError> {
        Ok(Vec::new())
    }
}
