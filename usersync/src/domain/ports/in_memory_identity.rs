//! In-memory identity service.
//!
//! Backs the JSON store adapter and doubles as the fixture for domain tests.
//! The organisation shape is fixed at construction, so the same type can
//! stand in for single-select, multi-group, and unsupported services.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::domain::{Membership, UserId, UserRecord};

use super::{
    CredentialStore, CredentialStoreError, IdentityService, IdentityServiceError, RoleProvider,
    RoleProviderError, UserGroupCapability, UserPage, UserTypeCapability,
};

/// Organisation shape an identity service exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum OrganisationShape {
    /// Each user has exactly one of `types`.
    UserTypes {
        /// Known user type aliases.
        types: Vec<String>,
    },
    /// Users belong to any subset of `groups`.
    UserGroups {
        /// Known group aliases.
        groups: Vec<String>,
    },
    /// Neither organisation operation set is available.
    Unsupported,
}

/// Users and role grants held by an [`InMemoryIdentityService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityState {
    /// Users in insertion order.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Roles keyed by username.
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
}

/// Identity service holding its records in memory.
#[derive(Debug)]
pub struct InMemoryIdentityService {
    shape: OrganisationShape,
    state: Mutex<IdentityState>,
    lossy_credential_saves: bool,
}

impl InMemoryIdentityService {
    /// Create an empty service with the given organisation shape.
    pub fn new(shape: OrganisationShape) -> Self {
        Self::with_state(shape, IdentityState::default())
    }

    /// Create a service pre-populated with `state`.
    pub fn with_state(shape: OrganisationShape, state: IdentityState) -> Self {
        Self {
            shape,
            state: Mutex::new(state),
            lossy_credential_saves: false,
        }
    }

    /// Make [`IdentityService::save`] keep the previously stored credential,
    /// as some hosts do when a full record is written back.
    #[must_use]
    pub fn with_lossy_credential_saves(mut self) -> Self {
        self.lossy_credential_saves = true;
        self
    }

    /// The organisation shape this service exposes.
    pub const fn shape(&self) -> &OrganisationShape {
        &self.shape
    }

    /// Grant `roles` to `username`, replacing earlier grants.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityServiceError::Unavailable`] if the state lock is
    /// poisoned.
    pub fn grant_roles(
        &self,
        username: &str,
        roles: Vec<String>,
    ) -> Result<(), IdentityServiceError> {
        self.state()?.roles.insert(username.to_owned(), roles);
        Ok(())
    }

    /// Copy out the current users and role grants.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityServiceError::Unavailable`] if the state lock is
    /// poisoned.
    pub fn snapshot(&self) -> Result<IdentityState, IdentityServiceError> {
        Ok(self.state()?.clone())
    }

    fn state(&self) -> Result<MutexGuard<'_, IdentityState>, IdentityServiceError> {
        self.state
            .lock()
            .map_err(|_| IdentityServiceError::unavailable("identity state lock poisoned"))
    }

    fn insert_new(
        &self,
        username: &str,
        email: &str,
        membership: Membership,
    ) -> Result<UserRecord, IdentityServiceError> {
        let mut state = self.state()?;
        if state
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(email))
        {
            return Err(IdentityServiceError::duplicate_email(email));
        }
        let mut user = UserRecord::new(UserId::random(), username, username, email);
        user.membership = membership;
        state.users.push(user.clone());
        Ok(user)
    }
}

fn canonical_alias(known: &[String], alias: &str) -> Option<String> {
    known
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(alias))
        .cloned()
}

impl IdentityService for InMemoryIdentityService {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityServiceError> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, IdentityServiceError> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|user| &user.id == id)
            .cloned())
    }

    fn save(&self, user: &UserRecord) -> Result<(), IdentityServiceError> {
        let lossy = self.lossy_credential_saves;
        let mut state = self.state()?;
        if state
            .users
            .iter()
            .any(|other| other.id != user.id && other.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(IdentityServiceError::duplicate_email(user.email.clone()));
        }
        match state.users.iter_mut().find(|existing| existing.id == user.id) {
            Some(existing) => {
                let kept_credential = std::mem::take(&mut existing.credential);
                *existing = user.clone();
                if lossy {
                    existing.credential = kept_credential;
                }
            }
            None => state.users.push(user.clone()),
        }
        Ok(())
    }

    fn list_users(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<UserPage, IdentityServiceError> {
        let state = self.state()?;
        let skip = page.checked_mul(page_size).unwrap_or(usize::MAX);
        Ok(UserPage {
            users: state.users.iter().skip(skip).take(page_size).cloned().collect(),
            total: state.users.len(),
        })
    }

    fn type_capability(&self) -> Option<&dyn UserTypeCapability> {
        match self.shape {
            OrganisationShape::UserTypes { .. } => Some(self),
            _ => None,
        }
    }

    fn group_capability(&self) -> Option<&dyn UserGroupCapability> {
        match self.shape {
            OrganisationShape::UserGroups { .. } => Some(self),
            _ => None,
        }
    }
}

impl UserTypeCapability for InMemoryIdentityService {
    fn list_types(&self) -> Result<Vec<String>, IdentityServiceError> {
        match &self.shape {
            OrganisationShape::UserTypes { types } => Ok(types.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn find_type(&self, alias: &str) -> Result<Option<String>, IdentityServiceError> {
        Ok(canonical_alias(&self.list_types()?, alias))
    }

    fn create_user_with_type(
        &self,
        username: &str,
        email: &str,
        user_type: &str,
    ) -> Result<UserRecord, IdentityServiceError> {
        let canonical = self
            .find_type(user_type)?
            .ok_or_else(|| IdentityServiceError::query(format!("unknown user type {user_type}")))?;
        self.insert_new(username, email, Membership::Organisation(canonical))
    }
}

impl UserGroupCapability for InMemoryIdentityService {
    fn list_groups(&self) -> Result<Vec<String>, IdentityServiceError> {
        match &self.shape {
            OrganisationShape::UserGroups { groups } => Ok(groups.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn find_group(&self, alias: &str) -> Result<Option<String>, IdentityServiceError> {
        Ok(canonical_alias(&self.list_groups()?, alias))
    }

    fn create_user(&self, username: &str, email: &str) -> Result<UserRecord, IdentityServiceError> {
        self.insert_new(username, email, Membership::Groups(Default::default()))
    }
}

impl RoleProvider for InMemoryIdentityService {
    fn roles_for_user(&self, username: &str) -> Result<Vec<String>, RoleProviderError> {
        let state = self
            .state()
            .map_err(|error| RoleProviderError::lookup(username, error.to_string()))?;
        Ok(state.roles.get(username).cloned().unwrap_or_default())
    }
}

impl CredentialStore for InMemoryIdentityService {
    fn read_credential(&self, id: &UserId) -> Result<Option<String>, CredentialStoreError> {
        let state = self
            .state()
            .map_err(|error| CredentialStoreError::access(id.as_str(), error.to_string()))?;
        Ok(state
            .users
            .iter()
            .find(|user| &user.id == id)
            .map(|user| user.credential.clone()))
    }

    fn write_credential(&self, id: &UserId, credential: &str) -> Result<(), CredentialStoreError> {
        let mut state = self
            .state()
            .map_err(|error| CredentialStoreError::access(id.as_str(), error.to_string()))?;
        let user = state
            .users
            .iter_mut()
            .find(|user| &user.id == id)
            .ok_or_else(|| CredentialStoreError::access(id.as_str(), "unknown user"))?;
        credential.clone_into(&mut user.credential);
        Ok(())
    }
}
