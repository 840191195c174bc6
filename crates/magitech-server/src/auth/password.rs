use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::MagitechError;

/// Hash a plaintext password using Argon2.
pub fn hash_password(password: &str) -> Result<String, MagitechError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MagitechError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a plaintext password against a stored hash.
/// A stored hash that does not parse counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("unparseable password hash in store: {}", e);
            false
        }
    }
}
