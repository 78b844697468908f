//! Error types for the example-users crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when parsing or querying a seed registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read registry file at '{path}': {message}")]
    IoError {
        /// Path to the registry file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The registry JSON is malformed or missing required fields.
    #[error("invalid registry JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The registry version is not supported.
    #[error("unsupported registry version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Expected version number.
        expected: u32,
        /// Actual version found in the registry.
        actual: u32,
    },

    /// The e-mail domain is empty or contains characters that cannot appear
    /// after the `@` of an address.
    #[error("invalid e-mail domain: '{domain}'")]
    InvalidEmailDomain {
        /// The rejected domain.
        domain: String,
    },

    /// A membership alias is blank or contains the group separator.
    #[error("invalid membership alias at index {index}: '{value}'")]
    InvalidMembershipAlias {
        /// Index of the invalid alias in the array.
        index: usize,
        /// The invalid alias.
        value: String,
    },

    /// The registry contains no seed definitions.
    #[error("registry contains no seed definitions")]
    EmptySeeds,

    /// The requested seed name was not found in the registry.
    #[error("seed '{name}' not found in registry")]
    SeedNotFound {
        /// The seed name that was not found.
        name: String,
    },
}

/// Errors that can occur during user generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Failed to generate a valid display name after maximum retries.
    #[error("failed to generate valid display name after {max_attempts} attempts")]
    DisplayNameGenerationFailed {
        /// Number of attempts made before giving up.
        max_attempts: usize,
    },

    /// The registry contains no membership aliases to assign.
    #[error("registry contains no membership aliases for selection")]
    NoMembershipAliases,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_io_formats_correctly() {
        let err = RegistryError::IoError {
            path: PathBuf::from("/tmp/seeds.json"),
            message: "file not found".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read registry file at '/tmp/seeds.json': file not found"
        );
    }

    #[test]
    fn registry_error_invalid_alias_formats_correctly() {
        let err = RegistryError::InvalidMembershipAlias {
            index: 1,
            value: "a.b".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid membership alias at index 1: 'a.b'");
    }

    #[test]
    fn registry_error_seed_not_found_formats_correctly() {
        let err = RegistryError::SeedNotFound {
            name: "mossy-owl".to_owned(),
        };
        assert_eq!(err.to_string(), "seed 'mossy-owl' not found in registry");
    }

    #[test]
    fn generation_error_no_aliases_formats_correctly() {
        assert_eq!(
            GenerationError::NoMembershipAliases.to_string(),
            "registry contains no membership aliases for selection"
        );
    }
}
