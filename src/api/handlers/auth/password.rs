//! Password hashing for signup, signin, and reset.

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

/// Hash a password with Argon2id and a fresh random salt (PHC string output).
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a candidate password against a stored PHC-format hash.
///
/// An unparseable stored hash counts as a mismatch rather than an error; the
/// caller answers the same invalid-credentials response either way.
pub(super) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("sesamo-malfermu").expect("hash password");
        assert!(verify_password("sesamo-malfermu", &hash));
        assert!(!verify_password("sesamo-fermu", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("sesamo-malfermu").expect("hash password");
        let second = hash_password("sesamo-malfermu").expect("hash password");
        assert_ne!(first, second);
    }

    #[test]
    fn verify_rejects_malformed_stored_hash() {
        assert!(!verify_password("sesamo-malfermu", "not-a-phc-string"));
    }
}
