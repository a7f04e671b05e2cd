use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use std::time::Duration;

use crate::config::Config;

/// Initialize the database connection from config.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    // An in-memory SQLite database exists per connection; more than one
    // pooled connection would each see their own empty database.
    let in_memory = config.database_url.contains(":memory:");
    let max_connections = if in_memory { 1 } else { 100 };
    let min_connections = if in_memory { 1 } else { 5 };

    let mut opts = ConnectOptions::new(&config.database_url);
    opts.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}
