//! Request extractors whose rejections render as [`MagitechError`]
//! envelopes instead of axum's plain-text defaults.
//!
//! - [`AuthUser`]: the player behind the bearer token.
//! - [`Json`]: request bodies; malformed JSON is a 400 `VALIDATION_ERROR`.
//! - [`Pagination`]: `limit`/`offset` for the session and character lists.
//!
//! [`MagitechError`]: crate::error::MagitechError

mod auth_user;
mod json;
mod pagination;

pub use auth_user::AuthUser;
pub use json::Json;
pub use pagination::Pagination;
