//! Password storage with Argon2id. Hashes are PHC strings, so the salt and
//! cost parameters are stored alongside the digest.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use orderflow_core::error::CoreError;

pub const MIN_PASSWORD_LENGTH: usize = 10;

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// `Ok(false)` for a wrong password. Errors only when `stored` is not a
/// valid PHC string.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(other) => Err(other),
    }
}

/// Rules for a new account's password.
pub fn validate_new_password(password: &str, username: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if password.eq_ignore_ascii_case(username.trim()) {
        return Err(CoreError::Validation(
            "Password must differ from the username".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_verifies_only_the_original_password() {
        let stored = hash_password("orderflow-passphrase").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("orderflow-passphrase", &stored).unwrap());
        assert!(!verify_password("orderflow-passphrasE", &stored).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("anything", "plaintext").is_err());
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("short", "alice").is_err());
        assert!(validate_new_password("ten-chars!", "alice").is_ok());
        assert!(validate_new_password("Manufacturer1", "manufacturer1").is_err());
    }
}
