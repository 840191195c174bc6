//! Magitech RPG session server.
//!
//! Tracks concurrent game sessions, turn order for multiplayer combat
//! encounters, and an append-only activity log that thin clients poll to
//! converge on shared world and combat state.

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod game;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod response;
pub mod routing;
pub mod testing;

pub use app::App;
pub use config::{Config, GameConfig};
pub use error::MagitechError;
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};
