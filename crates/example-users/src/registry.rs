//! Seed registry types and JSON parsing.
//!
//! The registry names the RNG seeds used for generation together with the
//! vocabulary generated users draw from: the e-mail domain, membership
//! aliases known to the identity store, and the sections users may be
//! granted.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RegistryError;
use crate::validation::is_valid_email;

/// Current supported registry version.
const SUPPORTED_VERSION: u32 = 1;

/// Separator the identity store uses between group aliases.
const GROUP_SEPARATOR: char = '.';

/// A seed registry containing named seeds and the vocabulary for generated
/// users.
///
/// # Example
///
/// ```
/// use example_users::SeedRegistry;
///
/// let json = r#"{
///     "version": 1,
///     "emailDomain": "example.org",
///     "membershipAliases": ["editor"],
///     "sections": [],
///     "seeds": [{"name": "test", "seed": 42, "userCount": 5}]
/// }"#;
///
/// let registry = SeedRegistry::from_json(json).expect("valid registry");
/// assert_eq!(registry.seeds().len(), 1);
/// assert_eq!(registry.email_domain(), "example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRegistry {
    version: u32,
    email_domain: String,
    membership_aliases: Vec<String>,
    sections: Vec<String>,
    seeds: Vec<SeedDefinition>,
}

impl SeedRegistry {
    /// Parses a seed registry from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the JSON is malformed, the version is
    /// unsupported, the e-mail domain or an alias is invalid, or the seeds
    /// array is empty.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: RawSeedRegistry =
            serde_json::from_str(json).map_err(|e| RegistryError::ParseError {
                message: e.to_string(),
            })?;

        Self::from_raw(raw)
    }

    /// Loads a seed registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let contents = fs::read_to_string(path).map_err(|e| RegistryError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_json(&contents)
    }

    fn from_raw(raw: RawSeedRegistry) -> Result<Self, RegistryError> {
        if raw.version != SUPPORTED_VERSION {
            return Err(RegistryError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                actual: raw.version,
            });
        }

        if !is_valid_email(&format!("user@{}", raw.email_domain)) {
            return Err(RegistryError::InvalidEmailDomain {
                domain: raw.email_domain,
            });
        }

        let membership_aliases = raw
            .membership_aliases
            .into_iter()
            .enumerate()
            .map(|(index, alias)| {
                if alias.trim().is_empty() || alias.contains(GROUP_SEPARATOR) {
                    Err(RegistryError::InvalidMembershipAlias {
                        index,
                        value: alias,
                    })
                } else {
                    Ok(alias)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if raw.seeds.is_empty() {
            return Err(RegistryError::EmptySeeds);
        }

        let seeds = raw
            .seeds
            .into_iter()
            .map(|s| SeedDefinition {
                name: s.name,
                seed: s.seed,
                user_count: s.user_count,
            })
            .collect();

        Ok(Self {
            version: raw.version,
            email_domain: raw.email_domain,
            membership_aliases,
            sections: raw.sections,
            seeds,
        })
    }

    /// Returns the registry version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the domain generated e-mail addresses use.
    #[must_use]
    pub fn email_domain(&self) -> &str {
        &self.email_domain
    }

    /// Returns the membership aliases users may be assigned.
    #[must_use]
    pub fn membership_aliases(&self) -> &[String] {
        &self.membership_aliases
    }

    /// Returns the section names users may be granted.
    #[must_use]
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Returns all seed definitions.
    #[must_use]
    pub fn seeds(&self) -> &[SeedDefinition] {
        &self.seeds
    }

    /// Finds a seed definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SeedNotFound`] if no seed with the given name
    /// exists.
    pub fn find_seed(&self, name: &str) -> Result<&SeedDefinition, RegistryError> {
        self.seeds
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RegistryError::SeedNotFound {
                name: name.to_owned(),
            })
    }
}

/// A named seed definition for deterministic user generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedDefinition {
    name: String,
    seed: u64,
    user_count: usize,
}

impl SeedDefinition {
    /// Returns the seed name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the RNG seed value.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of users to generate.
    #[must_use]
    pub const fn user_count(&self) -> usize {
        self.user_count
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeedRegistry {
    version: u32,
    email_domain: String,
    membership_aliases: Vec<String>,
    #[serde(default)]
    sections: Vec<String>,
    seeds: Vec<RawSeedDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeedDefinition {
    name: String,
    seed: u64,
    user_count: usize,
}
