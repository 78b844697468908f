//! Port abstraction for raw access to a user's stored credential.
//!
//! Some identity services drop or re-encode the credential when a full
//! record is saved. The raw store reads and writes the stored value directly
//! so an import can verify and correct it afterwards.

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by credential store adapters.
    pub enum CredentialStoreError {
        /// Reading or writing the credential failed.
        Access { id: String, message: String } =>
            "credential access for user {id} failed: {message}",
    }
}

/// Port for raw credential reads and writes keyed by user id.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Return the stored credential, or `None` for an unknown user.
    fn read_credential(&self, id: &UserId) -> Result<Option<String>, CredentialStoreError>;

    /// Overwrite the stored credential.
    fn write_credential(&self, id: &UserId, credential: &str) -> Result<(), CredentialStoreError>;
}
