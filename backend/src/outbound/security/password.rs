//! Argon2id password hashing adapter.
//!
//! Secrets are stored as PHC strings with a fresh random salt per hash.
//! Verification fails closed: a malformed stored hash verifies as false
//! rather than erroring, so login keeps its uniform failure shape.

use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};
use password_hash::{PasswordHash, SaltString};

use crate::domain::ports::{CredentialError, PasswordHasher};
use crate::domain::SecretHash;

/// Argon2id implementation of the password hashing port.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<SecretHash, CredentialError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|err| CredentialError::hash(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| CredentialError::hash(err.to_string()))?;

        let phc = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| CredentialError::hash(err.to_string()))?
            .to_string();
        Ok(SecretHash::new(phc))
    }

    fn verify(&self, plaintext: &str, hash: &SecretHash) -> bool {
        let Ok(parsed) = PasswordHash::new(hash.as_str()) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hashing_then_verifying_succeeds() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct-horse").expect("hashing succeeds");
        assert!(hasher.verify("correct-horse", &hash));
    }

    #[rstest]
    fn wrong_password_fails_verification() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct-horse").expect("hashing succeeds");
        assert!(!hasher.verify("wrong-horse", &hash));
    }

    #[rstest]
    fn malformed_stored_hashes_fail_closed() {
        let hasher = Argon2PasswordHasher;
        assert!(!hasher.verify("anything", &SecretHash::new("not-a-phc-string")));
    }

    #[rstest]
    fn salts_differ_between_hashes() {
        let hasher = Argon2PasswordHasher;
        let first = hasher.hash("correct-horse").expect("hashing succeeds");
        let second = hasher.hash("correct-horse").expect("hashing succeeds");
        assert_ne!(first.as_str(), second.as_str());
    }

    #[rstest]
    fn plaintext_never_appears_in_the_hash() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct-horse").expect("hashing succeeds");
        assert!(!hash.as_str().contains("correct-horse"));
    }
}
