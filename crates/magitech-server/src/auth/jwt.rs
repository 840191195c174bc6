use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MagitechError;

/// JWT claims payload.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username at issue time, for log context only
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Numeric user id carried in `sub`.
    pub fn user_id(&self) -> Result<i32, MagitechError> {
        self.sub
            .parse()
            .map_err(|_| MagitechError::Unauthorized("Invalid user ID in token".to_string()))
    }
}

/// Create a JWT token for a user.
pub fn create_token(
    user_id: i32,
    username: &str,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, MagitechError> {
    let now = Utc::now();
    let expires = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        name: username.to_string(),
        exp: expires.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| MagitechError::Internal(format!("Failed to create token: {}", e)))
}

/// Validate a JWT token and return the claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, MagitechError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| MagitechError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}
