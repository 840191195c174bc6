use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::game::GameState;

pub mod auth;
pub mod characters;
pub mod chat;
pub mod combat;
pub mod sessions;
pub mod sync;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub game: Arc<GameState>,
}
