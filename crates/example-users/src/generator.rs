//! Deterministic user generation from seed definitions.
//!
//! The same seed definition always produces identical users, so exported
//! file trees built from a generated store are reproducible.

use std::collections::HashSet;

use fake::Fake;
use fake::faker::lorem::raw::Sentence;
use fake::faker::name::raw::{FirstName, LastName};
use fake::locales::EN;
use rand::distr::Alphanumeric;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenerationError;
use crate::registry::{SeedDefinition, SeedRegistry};
use crate::seed::ExampleUserSeed;
use crate::validation::{
    DISPLAY_NAME_MAX, is_valid_display_name, sanitize_display_name, username_from_display_name,
};

/// Maximum number of attempts to generate a valid display name.
const MAX_NAME_ATTEMPTS: usize = 100;

/// Length of generated plaintext credentials.
const CREDENTIAL_LENGTH: usize = 16;

const MIN_MEMBERSHIPS: usize = 1;
const MAX_MEMBERSHIPS: usize = 2;
const MIN_SECTIONS: usize = 0;
const MAX_SECTIONS: usize = 3;

/// Approved accounts (90%).
const APPROVED_NUMERATOR: u32 = 9;
const APPROVED_DENOMINATOR: u32 = 10;

/// Locked-out accounts (5%).
const LOCKED_NUMERATOR: u32 = 1;
const LOCKED_DENOMINATOR: u32 = 20;

/// Generates example users from a seed definition.
///
/// Each user has a valid display name, a username and e-mail address unique
/// within the batch, a random alphanumeric credential, one or two
/// membership aliases, and up to three sections from the registry.
///
/// # Errors
///
/// Returns [`GenerationError`] if the registry has no membership aliases or
/// display name generation fails after maximum retries.
///
/// # Example
///
/// ```
/// use example_users::{SeedRegistry, generate_example_users};
///
/// let json = r#"{
///     "version": 1,
///     "emailDomain": "example.org",
///     "membershipAliases": ["editor"],
///     "seeds": [{"name": "test", "seed": 42, "userCount": 3}]
/// }"#;
///
/// let registry = SeedRegistry::from_json(json).expect("valid");
/// let seed_def = registry.find_seed("test").expect("found");
/// let users = generate_example_users(&registry, seed_def).expect("generated");
/// let again = generate_example_users(&registry, seed_def).expect("generated");
///
/// assert_eq!(users, again);
/// ```
pub fn generate_example_users(
    registry: &SeedRegistry,
    seed_def: &SeedDefinition,
) -> Result<Vec<ExampleUserSeed>, GenerationError> {
    if registry.membership_aliases().is_empty() {
        return Err(GenerationError::NoMembershipAliases);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed_def.seed());
    let mut taken = HashSet::new();
    let mut users = Vec::with_capacity(seed_def.user_count());

    for _ in 0..seed_def.user_count() {
        let user = generate_single_user(&mut rng, registry, &mut taken)?;
        users.push(user);
    }

    Ok(users)
}

fn generate_single_user(
    rng: &mut ChaCha8Rng,
    registry: &SeedRegistry,
    taken: &mut HashSet<String>,
) -> Result<ExampleUserSeed, GenerationError> {
    let display_name = generate_display_name(rng)?;
    let username = unique_username(&username_from_display_name(&display_name), taken);
    let email = format!("{username}@{}", registry.email_domain());

    let credential: String = (&mut *rng)
        .sample_iter(Alphanumeric)
        .take(CREDENTIAL_LENGTH)
        .map(char::from)
        .collect();
    let comments: String = Sentence(EN, 3..8).fake_with_rng(rng);

    let membership_aliases = select_subset(
        rng,
        registry.membership_aliases(),
        MIN_MEMBERSHIPS,
        MAX_MEMBERSHIPS,
    );
    let sections = select_subset(rng, registry.sections(), MIN_SECTIONS, MAX_SECTIONS);

    let approved = rng.random_ratio(APPROVED_NUMERATOR, APPROVED_DENOMINATOR);
    let locked_out = rng.random_ratio(LOCKED_NUMERATOR, LOCKED_DENOMINATOR);
    let failed_password_attempts = if locked_out {
        rng.random_range(3..=5)
    } else {
        rng.random_range(0..=2)
    };

    Ok(ExampleUserSeed {
        username,
        display_name,
        email,
        credential,
        comments,
        membership_aliases,
        sections,
        approved,
        locked_out,
        failed_password_attempts,
    })
}

/// Generates a valid display name, retrying up to `MAX_NAME_ATTEMPTS` times.
fn generate_display_name(rng: &mut ChaCha8Rng) -> Result<String, GenerationError> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let first: String = FirstName(EN).fake_with_rng(rng);
        let last: String = LastName(EN).fake_with_rng(rng);
        let sanitized = sanitize_display_name(&format!("{first} {last}"));
        let truncated: String = sanitized.chars().take(DISPLAY_NAME_MAX).collect();

        if is_valid_display_name(&truncated) {
            return Ok(truncated);
        }
    }

    Err(GenerationError::DisplayNameGenerationFailed {
        max_attempts: MAX_NAME_ATTEMPTS,
    })
}

/// Appends the smallest numeric suffix that makes `base` unused.
fn unique_username(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_owned();
    let mut suffix = 2_u32;
    while taken.contains(&candidate) {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Selects a deterministic subset bounded by `min_count` and `max_count`.
fn select_subset<T: Clone>(
    rng: &mut ChaCha8Rng,
    items: &[T],
    min_count: usize,
    max_count: usize,
) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }

    let clamped_min = min_count.min(items.len());
    let clamped_max = max_count.min(items.len());
    let count = if clamped_min == clamped_max {
        clamped_min
    } else {
        rng.random_range(clamped_min..=clamped_max)
    };

    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::validation::is_valid_email;

    const TEST_REGISTRY_JSON: &str = r#"{
        "version": 1,
        "emailDomain": "example.org",
        "membershipAliases": ["admin", "editor", "writer"],
        "sections": ["content", "media", "settings", "users"],
        "seeds": [
            {"name": "test-seed", "seed": 42, "userCount": 25},
            {"name": "small-seed", "seed": 123, "userCount": 2}
        ]
    }"#;

    #[fixture]
    fn test_registry() -> SeedRegistry {
        SeedRegistry::from_json(TEST_REGISTRY_JSON).expect("valid test registry")
    }

    fn generate(registry: &SeedRegistry, seed_name: &str) -> Vec<ExampleUserSeed> {
        let seed_def = registry.find_seed(seed_name).expect("seed should be found");
        generate_example_users(registry, seed_def).expect("generation should succeed")
    }

    #[rstest]
    fn generates_correct_user_count(test_registry: SeedRegistry) {
        assert_eq!(generate(&test_registry, "test-seed").len(), 25);
    }

    #[rstest]
    fn generation_is_deterministic(test_registry: SeedRegistry) {
        assert_eq!(
            generate(&test_registry, "test-seed"),
            generate(&test_registry, "test-seed")
        );
    }

    #[rstest]
    fn different_seeds_produce_different_users(test_registry: SeedRegistry) {
        let first = generate(&test_registry, "test-seed");
        let second = generate(&test_registry, "small-seed");
        assert_ne!(
            first.first().map(|u| u.credential.clone()),
            second.first().map(|u| u.credential.clone())
        );
    }

    #[rstest]
    fn emails_and_usernames_are_unique(test_registry: SeedRegistry) {
        let users = generate(&test_registry, "test-seed");
        let emails: HashSet<_> = users.iter().map(|u| u.email.as_str()).collect();
        let usernames: HashSet<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(emails.len(), users.len());
        assert_eq!(usernames.len(), users.len());
    }

    #[rstest]
    fn generated_fields_are_valid(test_registry: SeedRegistry) {
        for user in generate(&test_registry, "test-seed") {
            assert!(is_valid_display_name(&user.display_name), "{user:?}");
            assert!(is_valid_email(&user.email), "{user:?}");
            assert_eq!(user.credential.chars().count(), CREDENTIAL_LENGTH);
            assert!(!user.membership_aliases.is_empty());
            assert!(user.membership_aliases.len() <= MAX_MEMBERSHIPS);
            assert!(user.sections.len() <= MAX_SECTIONS);
        }
    }

    #[rstest]
    fn selections_stay_within_registry(test_registry: SeedRegistry) {
        for user in generate(&test_registry, "test-seed") {
            assert!(
                user.membership_aliases
                    .iter()
                    .all(|alias| test_registry.membership_aliases().contains(alias))
            );
            assert!(
                user.sections
                    .iter()
                    .all(|section| test_registry.sections().contains(section))
            );
        }
    }

    #[test]
    fn rejects_registry_without_membership_aliases() {
        let json = r#"{
            "version": 1,
            "emailDomain": "example.org",
            "membershipAliases": [],
            "seeds": [{"name": "test", "seed": 1, "userCount": 1}]
        }"#;
        let registry = SeedRegistry::from_json(json).expect("valid registry");
        let seed_def = registry.find_seed("test").expect("seed found");

        assert_eq!(
            generate_example_users(&registry, seed_def),
            Err(GenerationError::NoMembershipAliases)
        );
    }

    #[test]
    fn unique_username_appends_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(unique_username("ada", &mut taken), "ada");
        assert_eq!(unique_username("ada", &mut taken), "ada2");
        assert_eq!(unique_username("ada", &mut taken), "ada3");
    }

    #[test]
    fn select_subset_handles_empty_slice() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let items: Vec<String> = vec![];
        assert!(select_subset(&mut rng, &items, 1, 3).is_empty());
    }

    #[test]
    fn select_subset_respects_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let items: Vec<u32> = (0..10).collect();
        for _ in 0..100 {
            let subset = select_subset(&mut rng, &items, 2, 5);
            assert!((2..=5).contains(&subset.len()));
        }
    }
}
