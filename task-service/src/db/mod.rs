//! PostgreSQL pool setup for the `postgres` store backend.

use crate::config::DatabaseConfig;
use crate::services::Database;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Open the pool, apply pending migrations and wrap it as a store.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, AppError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(Database::new(pool))
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Schema migrations applied");
    Ok(())
}
