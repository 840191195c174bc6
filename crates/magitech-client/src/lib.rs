//! HTTP client for the Magitech RPG session server.
//!
//! [`NetworkManager`] wraps the JSON API: login, characters, sessions,
//! combat, chat, and the `/sync` poll that keeps a thin client current.

pub mod error;
pub mod network;
pub mod types;

pub use error::ClientError;
pub use network::{NetworkManager, DEFAULT_FAILURE_THRESHOLD};
pub use types::*;
