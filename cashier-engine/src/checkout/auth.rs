//! Secondary authorization for privileged checkout actions

use sha2::{Digest, Sha256};

/// Confirms a manager password before a privileged action
pub trait SecondaryAuthorizer: Send + Sync {
    fn verify(&self, password: &str) -> bool;
}

/// Checks passwords against a configured SHA-256 digest
#[derive(Clone)]
pub struct StaticPasswordAuthorizer {
    digest: String,
}

impl StaticPasswordAuthorizer {
    pub fn from_plain(password: &str) -> Self {
        Self {
            digest: hash_password(password),
        }
    }

    /// `digest` is a hex-encoded SHA-256 (case-insensitive)
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into().trim().to_ascii_lowercase(),
        }
    }
}

impl std::fmt::Debug for StaticPasswordAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPasswordAuthorizer").finish_non_exhaustive()
    }
}

impl SecondaryAuthorizer for StaticPasswordAuthorizer {
    fn verify(&self, password: &str) -> bool {
        !password.is_empty() && hash_password(password) == self.digest
    }
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_digest_agree() {
        let plain = StaticPasswordAuthorizer::from_plain("4321");
        assert!(plain.verify("4321"));
        assert!(!plain.verify("1234"));
        assert!(!plain.verify(""));

        let digest = StaticPasswordAuthorizer::from_digest(
            "FE2592B42A727E977F055947385B709CC82B16B9A87F88C6ABF3900D65D0CDC3",
        );
        assert!(digest.verify("4321"));
    }

    #[test]
    fn test_debug_hides_digest() {
        let auth = StaticPasswordAuthorizer::from_plain("secret");
        assert!(!format!("{auth:?}").contains(&hash_password("secret")));
    }
}
