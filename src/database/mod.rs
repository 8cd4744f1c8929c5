use std::str::FromStr;
use std::time::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use crate::config::CoreConfig;
use crate::errors::{DbError, DbResult};

pub mod migration;
pub mod transaction;

pub use transaction::{TransactionScope, TransactionState};

/// Open the connection pool described by `config`. Foreign keys are enforced on every connection.
pub async fn connect(config: &CoreConfig) -> DbResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DbError::ConnectionPool(format!("Invalid database url {}: {}", config.database_url, e)))?
        .foreign_keys(true)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.database_url.contains(":memory:") {
        // Each in-memory connection is its own database; never let the pool recycle it
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| DbError::ConnectionPool(format!("Failed to open {}: {}", config.database_url, e)))?;

    log::info!("Connected to database {}", config.database_url);
    Ok(pool)
}
