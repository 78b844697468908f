//! Organisation adapter over the two membership shapes.
//!
//! Identity services either give each user one user type or let users
//! belong to many groups. [`detect_organisation_model`] inspects the service
//! once; [`organisation_adapter`] then hands out the matching
//! [`OrganisationAdapter`], so callers never branch on the shape themselves.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ports::{IdentityService, IdentityServiceError};
use super::user::{Membership, UserRecord, split_aliases};

/// Page size used when walking single-select services.
pub const SINGLE_SELECT_PAGE_SIZE: usize = 1000;

/// Users requested in the one page read from multi-group services.
pub const MULTI_GROUP_PAGE_SIZE: usize = 100_000;

/// Membership shape of the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrganisationModel {
    /// Each user has exactly one organisation alias.
    SingleSelect,
    /// Users belong to any number of groups.
    MultiGroup,
    /// The service supports neither shape.
    NotImplemented,
}

impl fmt::Display for OrganisationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleSelect => "single-select",
            Self::MultiGroup => "multi-group",
            Self::NotImplemented => "not-implemented",
        })
    }
}

/// Error returned when parsing an unknown model name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown organisation model '{0}'; expected single-select or multi-group")]
pub struct UnknownOrganisationModel(pub String);

impl FromStr for OrganisationModel {
    type Err = UnknownOrganisationModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-select" | "single" | "types" => Ok(Self::SingleSelect),
            "multi-group" | "multi" | "groups" => Ok(Self::MultiGroup),
            other => Err(UnknownOrganisationModel(other.to_owned())),
        }
    }
}

/// Detect which organisation shape `service` supports.
///
/// Single-select wins when a service exposes both.
pub fn detect_organisation_model(service: &dyn IdentityService) -> OrganisationModel {
    if service.type_capability().is_some() {
        OrganisationModel::SingleSelect
    } else if service.group_capability().is_some() {
        OrganisationModel::MultiGroup
    } else {
        OrganisationModel::NotImplemented
    }
}

/// Lazily resolved organisation model shared by every adapter built from it.
///
/// The first resolution is kept for the life of the cache. A model supplied
/// up front bypasses probing entirely.
#[derive(Debug, Default)]
pub struct OrganisationModelCache {
    model: OnceLock<OrganisationModel>,
}

impl OrganisationModelCache {
    /// Cache that inspects the service on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pinned to an explicitly configured model.
    pub fn preset(model: OrganisationModel) -> Self {
        let cache = Self::default();
        cache.model.get_or_init(|| model);
        cache
    }

    /// The cached model, probing `service` if none is cached yet.
    pub fn resolve(&self, service: &dyn IdentityService) -> OrganisationModel {
        *self.model.get_or_init(|| {
            let model = detect_organisation_model(service);
            info!(%model, "resolved organisation model");
            model
        })
    }

    /// The cached model, if already resolved.
    pub fn get(&self) -> Option<OrganisationModel> {
        self.model.get().copied()
    }
}

/// Shape-independent organisation operations.
pub trait OrganisationAdapter: Send + Sync {
    /// Shape this adapter serves.
    fn model(&self) -> OrganisationModel;

    /// Create a user carrying `membership`.
    ///
    /// Returns `None` when the membership cannot be satisfied.
    fn create_user(
        &self,
        username: &str,
        email: &str,
        membership: &str,
    ) -> Result<Option<UserRecord>, IdentityServiceError>;

    /// Apply `membership` to `record` in memory.
    ///
    /// Returns `false` when nothing could be applied.
    fn set_membership(
        &self,
        record: &mut UserRecord,
        membership: &str,
    ) -> Result<bool, IdentityServiceError>;

    /// Current membership of `record` as a single string.
    fn membership(&self, record: &UserRecord) -> String {
        record.membership.to_wire()
    }

    /// Every membership alias the service knows.
    fn membership_names(&self) -> Result<Vec<String>, IdentityServiceError>;

    /// Every user in the service.
    fn all_users(&self) -> Result<Vec<UserRecord>, IdentityServiceError>;
}

/// Build the adapter for the model held by `cache`.
pub fn organisation_adapter(
    service: Arc<dyn IdentityService>,
    cache: &OrganisationModelCache,
) -> Arc<dyn OrganisationAdapter> {
    match cache.resolve(service.as_ref()) {
        OrganisationModel::SingleSelect => Arc::new(SingleSelectOrganisation { service }),
        OrganisationModel::MultiGroup => Arc::new(MultiGroupOrganisation { service }),
        OrganisationModel::NotImplemented => Arc::new(UnsupportedOrganisation),
    }
}

fn missing_capability(model: OrganisationModel) -> IdentityServiceError {
    IdentityServiceError::unavailable(format!(
        "identity service does not provide {model} operations"
    ))
}

/// Adapter for services assigning one user type per user.
pub struct SingleSelectOrganisation {
    service: Arc<dyn IdentityService>,
}

impl SingleSelectOrganisation {
    /// Wrap a service that exposes user types.
    pub fn new(service: Arc<dyn IdentityService>) -> Self {
        Self { service }
    }
}

impl OrganisationAdapter for SingleSelectOrganisation {
    fn model(&self) -> OrganisationModel {
        OrganisationModel::SingleSelect
    }

    fn create_user(
        &self,
        username: &str,
        email: &str,
        membership: &str,
    ) -> Result<Option<UserRecord>, IdentityServiceError> {
        let types = self
            .service
            .type_capability()
            .ok_or_else(|| missing_capability(self.model()))?;
        let Some(user_type) = types.find_type(membership.trim())? else {
            debug!(email, membership, "user type not found; user not created");
            return Ok(None);
        };
        types
            .create_user_with_type(username, email, &user_type)
            .map(Some)
    }

    fn set_membership(
        &self,
        record: &mut UserRecord,
        membership: &str,
    ) -> Result<bool, IdentityServiceError> {
        let types = self
            .service
            .type_capability()
            .ok_or_else(|| missing_capability(self.model()))?;
        match types.find_type(membership.trim())? {
            Some(user_type) => {
                record.membership = Membership::Organisation(user_type);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn membership_names(&self) -> Result<Vec<String>, IdentityServiceError> {
        self.service
            .type_capability()
            .ok_or_else(|| missing_capability(self.model()))?
            .list_types()
    }

    fn all_users(&self) -> Result<Vec<UserRecord>, IdentityServiceError> {
        let mut users = Vec::new();
        let mut page = 0;
        loop {
            let batch = self.service.list_users(page, SINGLE_SELECT_PAGE_SIZE)?;
            let fetched = batch.users.len();
            users.extend(batch.users);
            if fetched < SINGLE_SELECT_PAGE_SIZE || users.len() >= batch.total {
                break;
            }
            page += 1;
        }
        Ok(users)
    }
}

/// Adapter for services assigning any number of groups per user.
pub struct MultiGroupOrganisation {
    service: Arc<dyn IdentityService>,
}

impl MultiGroupOrganisation {
    /// Wrap a service that exposes user groups.
    pub fn new(service: Arc<dyn IdentityService>) -> Self {
        Self { service }
    }
}

impl OrganisationAdapter for MultiGroupOrganisation {
    fn model(&self) -> OrganisationModel {
        OrganisationModel::MultiGroup
    }

    fn create_user(
        &self,
        username: &str,
        email: &str,
        membership: &str,
    ) -> Result<Option<UserRecord>, IdentityServiceError> {
        let groups = self
            .service
            .group_capability()
            .ok_or_else(|| missing_capability(self.model()))?;
        let mut user = groups.create_user(username, email)?;
        self.set_membership(&mut user, membership)?;
        Ok(Some(user))
    }

    /// Add every resolvable alias. Unknown aliases are skipped and existing
    /// groups are kept, so this only fails when the service does.
    fn set_membership(
        &self,
        record: &mut UserRecord,
        membership: &str,
    ) -> Result<bool, IdentityServiceError> {
        let groups = self
            .service
            .group_capability()
            .ok_or_else(|| missing_capability(self.model()))?;

        let mut current = match std::mem::take(&mut record.membership) {
            Membership::Groups(aliases) => aliases,
            Membership::Organisation(alias) => BTreeSet::from([alias]),
            Membership::Unassigned => BTreeSet::new(),
        };
        let mut failure = None;
        for alias in split_aliases(membership) {
            match groups.find_group(alias) {
                Ok(Some(group)) => {
                    current.insert(group);
                }
                Ok(None) => debug!(email = %record.email, alias, "skipping unknown group"),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        record.membership = Membership::Groups(current);
        failure.map_or(Ok(true), Err)
    }

    fn membership_names(&self) -> Result<Vec<String>, IdentityServiceError> {
        self.service
            .group_capability()
            .ok_or_else(|| missing_capability(self.model()))?
            .list_groups()
    }

    fn all_users(&self) -> Result<Vec<UserRecord>, IdentityServiceError> {
        Ok(self.service.list_users(0, MULTI_GROUP_PAGE_SIZE)?.users)
    }
}

/// Adapter for services without a supported organisation shape.
///
/// Every operation reports failure or emptiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedOrganisation;

impl OrganisationAdapter for UnsupportedOrganisation {
    fn model(&self) -> OrganisationModel {
        OrganisationModel::NotImplemented
    }

    fn create_user(
        &self,
        _username: &str,
        _email: &str,
        _membership: &str,
    ) -> Result<Option<UserRecord>, IdentityServiceError> {
        Ok(None)
    }

    fn set_membership(
        &self,
        _record: &mut UserRecord,
        _membership: &str,
    ) -> Result<bool, IdentityServiceError> {
        Ok(false)
    }

    fn membership(&self, _record: &UserRecord) -> String {
        String::new()
    }

    fn membership_names(&self) -> Result<Vec<String>, IdentityServiceError> {
        Ok(Vec::new())
    }

    fn all_users(&self) -> Result<Vec<UserRecord>, IdentityServiceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests;
