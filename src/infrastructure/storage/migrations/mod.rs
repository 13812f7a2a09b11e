//! Database migrations infrastructure

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// PostgreSQL migrator with an embedded, versioned migration list
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration, returning whether it was applied now
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))?;

        if applied {
            return Ok(false);
        }

        // Migration bodies hold several statements
        sqlx::raw_sql(migration.up)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        Ok(true)
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM _migrations WHERE success = TRUE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))?;

        Ok(version)
    }
}

/// A schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

/// Schema of the semantic cache, blocklist and question/answer tables
pub fn cache_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Create vector_data table",
            up: r#"
            CREATE TABLE IF NOT EXISTS vector_data (
                id BIGSERIAL PRIMARY KEY,
                text TEXT NOT NULL,
                vector BYTEA NOT NULL,
                norm DOUBLE PRECISION NOT NULL,
                group_id BIGINT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vector_data_group_id ON vector_data(group_id);
            CREATE INDEX IF NOT EXISTS idx_vector_data_norm ON vector_data(norm);
            "#,
        },
        Migration {
            version: 2,
            description: "Create sensitive_words table",
            up: r#"
            CREATE TABLE IF NOT EXISTS sensitive_words (
                id BIGSERIAL PRIMARY KEY,
                text TEXT NOT NULL,
                vector BYTEA NOT NULL,
                norm DOUBLE PRECISION NOT NULL,
                group_id BIGINT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sensitive_words_group_id ON sensitive_words(group_id);
            CREATE INDEX IF NOT EXISTS idx_sensitive_words_norm ON sensitive_words(norm);
            CREATE INDEX IF NOT EXISTS idx_sensitive_words_text_group
                ON sensitive_words(text, group_id);
            "#,
        },
        Migration {
            version: 3,
            description: "Create questions and qa_cache tables",
            up: r#"
            CREATE TABLE IF NOT EXISTS questions (
                id BIGSERIAL PRIMARY KEY,
                question_text TEXT NOT NULL UNIQUE,
                vector_data_id BIGINT NOT NULL REFERENCES vector_data(id)
            );
            CREATE TABLE IF NOT EXISTS qa_cache (
                id BIGSERIAL PRIMARY KEY,
                answer_text TEXT NOT NULL,
                question_id BIGINT NOT NULL REFERENCES questions(id)
            );
            CREATE INDEX IF NOT EXISTS idx_qa_cache_question_id ON qa_cache(question_id);
            "#,
        },
    ]
}

/// Runs all pending cache migrations
pub async fn run_cache_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in cache_migrations() {
        if migrator.run_migration(&migration).await? {
            info!(
                version = migration.version,
                "Applied migration: {}", migration.description
            );
        }
    }

    Ok(())
}
