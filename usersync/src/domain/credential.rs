//! Reversible obfuscation of stored credentials.
//!
//! Exported files must not carry credentials in clear, yet an import has to
//! restore the exact stored value. The key is derived from the owner's
//! e-mail address and display name, so ciphertext is stable across exports
//! and a reviewer sees no diff until the credential or identity changes.
//!
//! This is obfuscation against casual reading, not encryption: anyone who
//! knows the scheme and the two identity attributes can reverse it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Bytes of a credential fingerprint rendered in logs.
const FINGERPRINT_BYTES: usize = 4;

/// Errors raised when revealing an obfuscated credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The ciphertext is not valid base64.
    #[error("obfuscated credential is not valid base64: {message}")]
    Encoding {
        /// Decoder message.
        message: String,
    },
    /// The revealed bytes are not UTF-8, usually because the key attributes
    /// differ from those used at export.
    #[error("revealed credential is not valid UTF-8")]
    KeyMismatch,
}

/// Obfuscates credentials with a key bound to one identity.
///
/// # Examples
/// ```
/// use usersync::domain::CredentialObfuscator;
///
/// let obfuscator = CredentialObfuscator::for_identity("ada@example.org", "Ada Lovelace");
/// let hidden = obfuscator.obfuscate("hash$1");
/// assert_ne!(hidden, "hash$1");
/// assert_eq!(obfuscator.reveal(&hidden).expect("reveal"), "hash$1");
/// ```
#[derive(Clone)]
pub struct CredentialObfuscator {
    key: [u8; 32],
}

impl std::fmt::Debug for CredentialObfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialObfuscator")
            .finish_non_exhaustive()
    }
}

impl CredentialObfuscator {
    /// Derive the key from the owner's e-mail address and display name.
    pub fn for_identity(email: &str, display_name: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(email.as_bytes())
            .chain_update(display_name.as_bytes())
            .finalize();
        let mut key = [0_u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Hide `credential`; an empty credential stays empty.
    pub fn obfuscate(&self, credential: &str) -> String {
        if credential.is_empty() {
            return String::new();
        }
        STANDARD.encode(self.apply(credential.as_bytes()))
    }

    /// Recover a credential hidden by [`Self::obfuscate`] with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Encoding`] for text that is not base64 and
    /// [`CredentialError::KeyMismatch`] when the revealed bytes are not
    /// UTF-8.
    pub fn reveal(&self, obfuscated: &str) -> Result<String, CredentialError> {
        let trimmed = obfuscated.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|error| CredentialError::Encoding {
                message: error.to_string(),
            })?;
        String::from_utf8(self.apply(&bytes)).map_err(|_| CredentialError::KeyMismatch)
    }

    fn apply(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .zip(self.keystream())
            .map(|(byte, mask)| byte ^ mask)
            .collect()
    }

    fn keystream(&self) -> impl Iterator<Item = u8> + '_ {
        (0_u64..).flat_map(move |block| {
            Sha256::new()
                .chain_update(self.key)
                .chain_update(block.to_be_bytes())
                .finalize()
                .to_vec()
        })
    }
}

/// Short, non-reversible fingerprint of a credential for log fields.
///
/// # Examples
/// ```
/// use usersync::domain::credential_fingerprint;
///
/// assert_eq!(credential_fingerprint("secret").len(), 8);
/// assert_eq!(credential_fingerprint(""), "");
/// ```
pub fn credential_fingerprint(credential: &str) -> String {
    if credential.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(credential.as_bytes());
    hex::encode(digest.iter().take(FINGERPRINT_BYTES).copied().collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    //! Round trips, key binding, and malformed input.

    use rstest::rstest;

    use super::*;

    fn ada() -> CredentialObfuscator {
        CredentialObfuscator::for_identity("ada@example.org", "Ada Lovelace")
    }

    #[rstest]
    #[case::short("x")]
    #[case::hash("AQAAAAEAACcQAAAAEHjZ0o6wZqYqQ+Y3H3f8Zt4=")]
    #[case::long("a much longer credential that spans more than one thirty-two byte block")]
    #[case::unicode("pässwörd-✓")]
    fn round_trips(#[case] credential: &str) {
        let hidden = ada().obfuscate(credential);
        assert_ne!(hidden, credential);
        assert_eq!(ada().reveal(&hidden).expect("reveal"), credential);
    }

    #[test]
    fn obfuscation_is_deterministic() {
        assert_eq!(ada().obfuscate("secret"), ada().obfuscate("secret"));
    }

    #[test]
    fn key_depends_on_identity() {
        let other = CredentialObfuscator::for_identity("ada@example.org", "Ada King");
        assert_ne!(ada().obfuscate("secret"), other.obfuscate("secret"));
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(ada().obfuscate(""), "");
        assert_eq!(ada().reveal("").expect("reveal"), "");
        assert_eq!(ada().reveal("  ").expect("reveal"), "");
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(
            ada().reveal("not base64!"),
            Err(CredentialError::Encoding { .. })
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        assert_eq!(format!("{:?}", ada()), "CredentialObfuscator { .. }");
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let first = credential_fingerprint("secret");
        assert_eq!(first, credential_fingerprint("secret"));
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, credential_fingerprint("other"));
    }
}
