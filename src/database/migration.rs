use log::{debug, error, info};
use sqlx::SqlitePool;
use crate::errors::{DbError, DbResult};
use crate::types::timestamp_now;

// Embed all migration SQL files at compile time
const MIGRATION_USERS_PLACES: &str = include_str!("../../migrations/20260101000000_users_places.sql");
const MIGRATION_PROPERTY_AGGREGATE: &str = include_str!("../../migrations/20260101000100_property_aggregate.sql");
const MIGRATION_BOOKINGS_PAYMENTS: &str = include_str!("../../migrations/20260101000200_bookings_payments.sql");

// List of migrations with their names and SQL content, oldest first
const MIGRATIONS: &[(&str, &str)] = &[
    ("20260101000000_users_places.sql", MIGRATION_USERS_PLACES),
    ("20260101000100_property_aggregate.sql", MIGRATION_PROPERTY_AGGREGATE),
    ("20260101000200_bookings_payments.sql", MIGRATION_BOOKINGS_PAYMENTS),
];

/// Bring the schema up to date. Returns the names of the migrations applied by this call.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    info!("Starting database migration process");

    create_migrations_table(pool).await?;

    let last_migration = get_last_migration(pool).await?;
    match &last_migration {
        Some(name) => debug!("Last applied migration: {}", name),
        None => debug!("No migrations applied yet"),
    }

    let applied = apply_pending_migrations(pool, last_migration).await?;
    info!("Database migration process completed ({} applied)", applied.len());
    Ok(applied)
}

/// Create migrations table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to create migrations table: {}", e)))?;

    Ok(())
}

/// Get the last applied migration
async fn get_last_migration(pool: &SqlitePool) -> DbResult<Option<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM migrations ORDER BY id DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to get last migration: {}", e)))
}

/// Apply pending migrations in one transaction
async fn apply_pending_migrations(
    pool: &SqlitePool,
    last_migration: Option<String>,
) -> DbResult<Vec<&'static str>> {
    let pending_migrations = get_pending_migrations(last_migration.as_deref())?;

    if pending_migrations.is_empty() {
        debug!("No pending migrations to apply");
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await
        .map_err(|e| DbError::Migration(format!("Failed to begin transaction: {}", e)))?;

    let mut applied = Vec::with_capacity(pending_migrations.len());
    for (migration_name, migration_sql) in pending_migrations {
        info!("Applying migration: {}", migration_name);

        sqlx::raw_sql(migration_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to apply migration {}: {}", migration_name, e);
                DbError::Migration(format!("Failed to apply migration {}: {}", migration_name, e))
            })?;

        sqlx::query(
            "INSERT INTO migrations (name, applied_at) VALUES (?, ?)"
        )
        .bind(migration_name)
        .bind(timestamp_now())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::Migration(format!("Failed to record migration {}: {}", migration_name, e)))?;

        applied.push(migration_name);
    }

    tx.commit().await
        .map_err(|e| DbError::Migration(format!("Failed to commit migrations: {}", e)))?;

    Ok(applied)
}

/// Determine which migrations need to be applied
fn get_pending_migrations(last_migration: Option<&str>) -> DbResult<Vec<(&'static str, &'static str)>> {
    let Some(last) = last_migration else {
        return Ok(MIGRATIONS.to_vec());
    };

    let position = MIGRATIONS
        .iter()
        .position(|(name, _)| *name == last)
        .ok_or_else(|| DbError::Migration(format!(
            "Database was migrated by an unknown migration {}; refusing to continue", last
        )))?;

    Ok(MIGRATIONS[position + 1..].to_vec())
}
