use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://magitech.db?mode=rwc)
    pub database_url: String,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT token expiry in hours (default: 24)
    pub jwt_expiry_hours: u64,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 5000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    /// Gameplay tunables for sessions and combat.
    pub game: GameConfig,
}

/// Session and combat tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Delay before a scheduled enemy turn fires, in milliseconds.
    pub enemy_turn_delay_ms: u64,

    /// Advisory per-turn timeout reported to clients. Nothing enforces it.
    pub turn_timeout_secs: u64,

    /// Upper bound for `max_players` on a new session.
    pub max_players_per_session: i32,

    /// Maximum number of activities returned by a single sync.
    pub sync_activity_limit: u64,

    /// Number of chat messages returned by default.
    pub chat_history_limit: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            enemy_turn_delay_ms: 2000,
            turn_timeout_secs: 30,
            max_players_per_session: 4,
            sync_activity_limit: 100,
            chat_history_limit: 50,
        }
    }
}

impl GameConfig {
    /// Load game tunables from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = GameConfig::default();
        GameConfig {
            enemy_turn_delay_ms: env_parse("ENEMY_TURN_DELAY_MS", defaults.enemy_turn_delay_ms),
            turn_timeout_secs: env_parse("TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            max_players_per_session: env_parse(
                "MAX_PLAYERS_PER_SESSION",
                defaults.max_players_per_session,
            )
            .max(1),
            sync_activity_limit: env_parse("SYNC_ACTIVITY_LIMIT", defaults.sync_activity_limit)
                .max(1),
            chat_history_limit: env_parse("CHAT_HISTORY_LIMIT", defaults.chat_history_limit)
                .max(1),
        }
    }

    pub fn enemy_turn_delay(&self) -> Duration {
        Duration::from_millis(self.enemy_turn_delay_ms)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://magitech.db?mode=rwc".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "magitech-dev-secret-change-me".to_string()),
            jwt_expiry_hours: env_parse("JWT_EXPIRY_HOURS", 24),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env_parse("SERVER_PORT", 5000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            game: GameConfig::from_env(),
        })
    }

    /// Configuration for tests: in-memory SQLite, ephemeral port, short enemy delay.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-for-testing".to_string(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            environment: "test".to_string(),
            game: GameConfig {
                enemy_turn_delay_ms: 50,
                ..GameConfig::default()
            },
        }
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
