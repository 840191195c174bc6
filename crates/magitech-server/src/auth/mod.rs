pub mod jwt;
pub mod password;

pub use jwt::{create_token, validate_token, Claims};
pub use password::{hash_password, verify_password};

use crate::error::MagitechError;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Check registration credentials before anything touches the database.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), MagitechError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(MagitechError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(MagitechError::Validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(MagitechError::Validation(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(MagitechError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
