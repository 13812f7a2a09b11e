//! Migrate command - creates or upgrades the cache schema

use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::storage::{run_cache_migrations, PostgresMigrator};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pool = crate::connect_database(&config).await?;

    run_cache_migrations(&pool).await?;

    let version = PostgresMigrator::new(pool.clone()).current_version().await?;
    info!(?version, "Schema up to date");
    println!("schema version: {}", version.unwrap_or_default());

    pool.close().await;
    Ok(())
}
