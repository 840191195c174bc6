//! Tracing subscriber setup for the session server.
//!
//! The level is controlled by `RUST_LOG`:
//!
//! ```bash
//! # Request traces plus combat timer activity
//! RUST_LOG=debug magitech-server
//!
//! # Fine-grained control
//! RUST_LOG=magitech_server=debug,tower_http=info,sqlx=warn magitech-server
//! ```
//!
//! Call one of the `init_logging*` functions once, before building the `App`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Which formatter [`init_from_env`] should install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; unknown values fall back to `Plain`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging with an `info` default.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Initialize logging with a specific default level (`RUST_LOG` still wins).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_level(level: &str) {
    tracing_subscriber::registry()
        .with(default_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize pretty-formatted logging (development).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_pretty() {
    tracing_subscriber::registry()
        .with(default_filter("info"))
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true),
        )
        .init();
}

/// Initialize JSON-formatted logging (production log aggregation).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_json() {
    tracing_subscriber::registry()
        .with(default_filter("info"))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Pick the formatter from `LOG_FORMAT` (`plain`, `pretty`, `json`).
pub fn init_from_env() {
    let format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::parse(&v))
        .unwrap_or(LogFormat::Plain);
    match format {
        LogFormat::Plain => init_logging(),
        LogFormat::Pretty => init_logging_pretty(),
        LogFormat::Json => init_logging_json(),
    }
}
