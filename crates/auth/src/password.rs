//! Password hashing and verification
//!
//! Argon2id in PHC string format. Only staff/admin accounts have password
//! hashes; guardian sessions come in through the one-time-code flow.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AuthError, Result};

/// Hash a password, returning the PHC-format string to persist
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC-format hash
///
/// A malformed stored hash verifies as `false` rather than erroring: the
/// caller is mid-login and must answer "invalid email or password" either
/// way, without hinting that the account record is damaged.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
