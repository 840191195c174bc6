use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use std::time::Duration;

use crate::config::Config;

/// Initialize the database connection from config.
///
/// An in-memory SQLite database lives only as long as its connection, so
/// those URLs get a single pooled connection that is never recycled.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(&config.database_url);
    opts.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    if is_memory_url(&config.database_url) {
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(16)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800));
    }

    SeaDatabase::connect(opts).await
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_memory_urls() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file.db?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://magitech.db?mode=rwc"));
    }
}
