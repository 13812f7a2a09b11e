//! Storage infrastructure - PostgreSQL pool and schema

pub mod migrations;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::DomainError;

pub use migrations::{cache_migrations, run_cache_migrations, Migration, PostgresMigrator};

/// Opens a connection pool to the cache database
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to database: {}", e)))?;

    info!(max_connections, "Connected to PostgreSQL");

    Ok(pool)
}
