//! Validation rules for generated identity fields.
//!
//! - Display names are 3 to 32 characters of letters, digits, spaces, and
//!   underscores, and are not whitespace-only.
//! - E-mail addresses hold exactly one `@` with a non-empty local part and
//!   a dotted domain, and contain no whitespace.

/// Minimum allowed length for a display name.
pub const DISPLAY_NAME_MIN: usize = 3;

/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 32;

/// Validates a display name.
///
/// # Examples
///
/// ```
/// use example_users::is_valid_display_name;
///
/// assert!(is_valid_display_name("Ada Lovelace"));
/// assert!(is_valid_display_name("user_123"));
/// assert!(!is_valid_display_name("ab"));
/// assert!(!is_valid_display_name("O'Brien"));
/// assert!(!is_valid_display_name("   "));
/// ```
#[must_use]
pub fn is_valid_display_name(name: &str) -> bool {
    let length = name.chars().count();
    if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&length) {
        return false;
    }
    if name.trim().is_empty() {
        return false;
    }
    name.chars().all(is_valid_display_name_char)
}

/// Validates the shape of an e-mail address.
///
/// # Examples
///
/// ```
/// use example_users::is_valid_email;
///
/// assert!(is_valid_email("ada@example.org"));
/// assert!(!is_valid_email("ada@localhost"));
/// assert!(!is_valid_email("ada@@example.org"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

const fn is_valid_display_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '_'
}

/// Replaces characters a display name may not hold with underscores.
#[must_use]
pub(crate) fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if is_valid_display_name_char(c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derives a lowercase login name from a display name.
///
/// Words are joined with dots; underscores are dropped.
#[must_use]
pub(crate) fn username_from_display_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
