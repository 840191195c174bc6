use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth;
use crate::config::Config;
use crate::error::MagitechError;

/// Extractor that validates the bearer JWT and yields the caller.
///
/// ```rust,ignore
/// async fn my_handler(user: AuthUser) -> impl IntoResponse {
///     tracing::info!(user_id = user.id, "hello {}", user.username);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = MagitechError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                MagitechError::Unauthorized("Missing Authorization header".to_string())
            })?;

        // Expect "Bearer <token>"
        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            MagitechError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let config = parts
            .extensions
            .get::<Arc<Config>>()
            .ok_or_else(|| MagitechError::Internal("Config not found in request".to_string()))?;

        let claims = auth::validate_token(token, &config.jwt_secret)?;

        Ok(AuthUser {
            id: claims.user_id()?,
            username: claims.name,
        })
    }
}
