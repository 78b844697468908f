//! Generated user seed types.
//!
//! These types are independent of the synchronisation engine's record type
//! and are converted into it where the store is populated.

use serde::{Deserialize, Serialize};

/// A generated example identity record.
///
/// # Example
///
/// ```
/// use example_users::ExampleUserSeed;
///
/// let user = ExampleUserSeed {
///     username: "ada.lovelace".to_owned(),
///     display_name: "Ada Lovelace".to_owned(),
///     email: "ada.lovelace@example.org".to_owned(),
///     credential: "s3cret".to_owned(),
///     comments: String::new(),
///     membership_aliases: vec!["editor".to_owned()],
///     sections: vec![],
///     approved: true,
///     locked_out: false,
///     failed_password_attempts: 0,
/// };
///
/// assert_eq!(user.display_name, "Ada Lovelace");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleUserSeed {
    /// Login name, unique within a generated batch.
    pub username: String,
    /// Human-readable display name.
    pub display_name: String,
    /// E-mail address, unique within a generated batch.
    pub email: String,
    /// Plaintext credential.
    pub credential: String,
    /// Free-text administrator comments.
    pub comments: String,
    /// Membership aliases drawn from the registry.
    pub membership_aliases: Vec<String>,
    /// Sections drawn from the registry.
    pub sections: Vec<String>,
    /// Whether the account is approved.
    pub approved: bool,
    /// Whether the account is locked out.
    pub locked_out: bool,
    /// Number of failed password attempts.
    pub failed_password_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_user_seed_serializes_to_camel_case() {
        let user = ExampleUserSeed {
            username: "test".to_owned(),
            display_name: "Test".to_owned(),
            email: "test@example.org".to_owned(),
            credential: String::new(),
            comments: String::new(),
            membership_aliases: vec![],
            sections: vec![],
            approved: true,
            locked_out: false,
            failed_password_attempts: 0,
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(json.contains("displayName"));
        assert!(json.contains("membershipAliases"));
        assert!(json.contains("lockedOut"));
        assert!(json.contains("failedPasswordAttempts"));
    }
}
