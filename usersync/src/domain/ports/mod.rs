//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_store;
mod identity_service;
mod in_memory_files;
mod in_memory_identity;
mod pause;
mod role_provider;
mod sync_file_store;

#[cfg(test)]
pub use credential_store::MockCredentialStore;
pub use credential_store::{CredentialStore, CredentialStoreError};
#[cfg(test)]
pub use identity_service::{MockUserGroupCapability, MockUserTypeCapability};
pub use identity_service::{
    IdentityService, IdentityServiceError, UserGroupCapability, UserPage, UserTypeCapability,
};
pub use in_memory_files::InMemorySyncFileStore;
pub use in_memory_identity::{IdentityState, InMemoryIdentityService, OrganisationShape};
pub use pause::{PauseFlag, PauseGuard, SyncPause};
#[cfg(test)]
pub use role_provider::MockRoleProvider;
pub use role_provider::{NoRoles, RoleProvider, RoleProviderError};
#[cfg(test)]
pub use sync_file_store::MockSyncFileStore;
pub use sync_file_store::{FolderListing, SyncFileStore, SyncFileStoreError};
