//! Deterministic example identity records for exercising user synchronisation.
//!
//! The crate turns a JSON seed registry into reproducible user records that
//! can be loaded into an identity store before running an export. It does
//! not depend on the synchronisation engine's domain types; callers convert
//! [`ExampleUserSeed`] values at the point of use.
//!
//! # Example
//!
//! ```
//! use example_users::{SeedRegistry, generate_example_users};
//!
//! let json = r#"{
//!     "version": 1,
//!     "emailDomain": "example.org",
//!     "membershipAliases": ["editor", "writer"],
//!     "sections": ["content", "media"],
//!     "seeds": [{"name": "test-seed", "seed": 42, "userCount": 3}]
//! }"#;
//!
//! let registry = SeedRegistry::from_json(json).expect("valid registry");
//! let seed_def = registry.find_seed("test-seed").expect("seed exists");
//! let users = generate_example_users(&registry, seed_def).expect("generation succeeds");
//!
//! assert_eq!(users.len(), 3);
//! ```

mod error;
mod generator;
mod registry;
mod seed;
mod validation;

pub use error::{GenerationError, RegistryError};
pub use generator::generate_example_users;
pub use registry::{SeedDefinition, SeedRegistry};
pub use seed::ExampleUserSeed;
pub use validation::{DISPLAY_NAME_MAX, DISPLAY_NAME_MIN, is_valid_display_name, is_valid_email};
