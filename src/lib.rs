//! Relay Cache
//!
//! Semantic response cache and vector blocklist for an LLM relay:
//! - Embeddings binarized into fingerprints and bucketed by norm
//! - Hamming-distance lookups within one bucket
//! - Probabilistic reuse of stored answers
//! - Phrase blocklist on the same engine
//! - PostgreSQL persistence with embedded migrations

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use sqlx::postgres::PgPool;
use tracing::info;

use domain::semantic_cache::{QaStore, VectorStore, VectorTable};
use domain::{DomainError, EmbeddingProvider};
use infrastructure::embedding::EmbeddingProviderFactory;
use infrastructure::semantic_cache::{PostgresQaStore, PostgresVectorStore};
use infrastructure::services::{RelayGate, SemanticCacheService, SensitiveFilterService};
use infrastructure::storage::{connect_pool, run_cache_migrations};

/// Everything a command needs: configuration, pool and the request gate
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub pool: PgPool,
    pub gate: RelayGate,
}

/// Stores backing one relay gate
#[derive(Debug, Clone)]
pub struct GateStores {
    pub cache_entries: Arc<dyn VectorStore>,
    pub sensitive_phrases: Arc<dyn VectorStore>,
    pub answers: Arc<dyn QaStore>,
}

impl GateStores {
    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            cache_entries: Arc::new(PostgresVectorStore::new(
                pool.clone(),
                VectorTable::CacheEntries,
            )),
            sensitive_phrases: Arc::new(PostgresVectorStore::new(
                pool.clone(),
                VectorTable::SensitivePhrases,
            )),
            answers: Arc::new(PostgresQaStore::new(pool.clone())),
        }
    }
}

/// Open the database configured in `config`
pub async fn connect_database(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config.database.resolve_url().ok_or_else(|| {
        anyhow::anyhow!("database.url or the DATABASE_URL environment variable is required")
    })?;

    Ok(connect_pool(&url, config.database.max_connections).await?)
}

/// Assemble the cache, blocklist and gate from explicit parts
pub fn build_relay_gate(
    config: &AppConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    stores: GateStores,
) -> Result<RelayGate, DomainError> {
    let print_vector = config.embedding.print_vector;

    let cache = SemanticCacheService::new(
        embedding_provider.clone(),
        stores.cache_entries,
        stores.answers,
        config.cache.clone(),
    )?
    .with_print_vector(print_vector);

    let blocklist = config.cache.vector_index(stores.sensitive_phrases)?;
    let sensitive =
        SensitiveFilterService::new(embedding_provider, blocklist, config.sensitive.clone())?
            .with_print_vector(print_vector);

    Ok(RelayGate::new(Arc::new(cache), Arc::new(sensitive)))
}

/// Connect, migrate and build the gate from configuration
pub async fn create_app_context(config: AppConfig) -> anyhow::Result<AppContext> {
    let pool = connect_database(&config).await?;
    run_cache_migrations(&pool).await?;

    let provider = EmbeddingProviderFactory::create(&config.embedding)?;
    let gate = build_relay_gate(&config, provider, GateStores::postgres(&pool))?;

    info!(
        cache_enabled = config.cache.enabled,
        sensitive_enabled = config.sensitive.enabled,
        provider = config.embedding.provider.as_str(),
        "Relay gate ready"
    );

    Ok(AppContext { config, pool, gate })
}
