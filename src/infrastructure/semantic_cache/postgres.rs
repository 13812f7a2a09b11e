//! PostgreSQL semantic cache stores

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::semantic_cache::{
    CacheEntry, Fingerprint, QaStore, Question, VectorRecord, VectorStore, VectorTable,
};
use crate::domain::DomainError;

/// PostgreSQL vector table (`vector_data` or `sensitive_words`)
#[derive(Debug, Clone)]
pub struct PostgresVectorStore {
    pool: PgPool,
    table: VectorTable,
}

impl PostgresVectorStore {
    pub fn new(pool: PgPool, table: VectorTable) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl VectorStore for PostgresVectorStore {
    fn table(&self) -> VectorTable {
        self.table
    }

    async fn insert(&self, entry: CacheEntry) -> Result<i64, DomainError> {
        let query = format!(
            "INSERT INTO {} (text, vector, norm, group_id) VALUES ($1, $2, $3, $4) RETURNING id",
            self.table.table_name()
        );

        sqlx::query_scalar::<_, i64>(&query)
            .bind(&entry.text)
            .bind(entry.fingerprint.into_bytes())
            .bind(entry.norm)
            .bind(entry.bucket_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to insert vector: {}", e)))
    }

    async fn scan_bucket(&self, bucket_id: i64) -> Result<Vec<VectorRecord>, DomainError> {
        let query = format!(
            "SELECT id, text, vector FROM {} WHERE group_id = $1 ORDER BY id",
            self.table.table_name()
        );

        let rows = sqlx::query(&query)
            .bind(bucket_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to scan bucket: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn contains(&self, text: &str, bucket_id: i64) -> Result<bool, DomainError> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE text = $1 AND group_id = $2)",
            self.table.table_name()
        );

        sqlx::query_scalar::<_, bool>(&query)
            .bind(text)
            .bind(bucket_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check existing text: {}", e)))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table.table_name());

        let count: i64 = sqlx::query_scalar(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count vectors: {}", e)))?;

        Ok(count.max(0) as u64)
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<VectorRecord, DomainError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| DomainError::storage(format!("Failed to read id: {}", e)))?;
    let text: String = row
        .try_get("text")
        .map_err(|e| DomainError::storage(format!("Failed to read text: {}", e)))?;
    let vector: Vec<u8> = row
        .try_get("vector")
        .map_err(|e| DomainError::storage(format!("Failed to read vector: {}", e)))?;

    Ok(VectorRecord {
        id,
        text,
        fingerprint: Fingerprint::from_bytes(vector),
    })
}

/// PostgreSQL `questions` and `qa_cache` tables
#[derive(Debug, Clone)]
pub struct PostgresQaStore {
    pool: PgPool,
}

impl PostgresQaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QaStore for PostgresQaStore {
    async fn find_question(&self, question_text: &str) -> Result<Option<Question>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, question_text, vector_data_id
            FROM questions
            WHERE question_text = $1
            "#,
        )
        .bind(question_text)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get question: {}", e)))?;

        row.as_ref().map(row_to_question).transpose()
    }

    async fn get_or_create_question(
        &self,
        question_text: &str,
        cache_entry_id: i64,
    ) -> Result<Question, DomainError> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let row = sqlx::query(
            r#"
            INSERT INTO questions (question_text, vector_data_id)
            VALUES ($1, $2)
            ON CONFLICT (question_text)
            DO UPDATE SET question_text = EXCLUDED.question_text
            RETURNING id, question_text, vector_data_id
            "#,
        )
        .bind(question_text)
        .bind(cache_entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to upsert question: {}", e)))?;

        row_to_question(&row)
    }

    async fn insert_answer(
        &self,
        question_id: i64,
        answer_text: &str,
    ) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO qa_cache (answer_text, question_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(answer_text)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert answer: {}", e)))
    }

    async fn random_answer(&self, question_text: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.answer_text
            FROM qa_cache a
            JOIN questions q ON q.id = a.question_id
            WHERE q.question_text = $1
            ORDER BY RANDOM()
            LIMIT 1
            "#,
        )
        .bind(question_text)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get random answer: {}", e)))
    }

    async fn counts(&self) -> Result<(u64, u64), DomainError> {
        let (questions, answers): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM questions), (SELECT COUNT(*) FROM qa_cache)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to count questions: {}", e)))?;

        Ok((questions.max(0) as u64, answers.max(0) as u64))
    }
}

fn row_to_question(row: &sqlx::postgres::PgRow) -> Result<Question, DomainError> {
    Ok(Question {
        id: row
            .try_get("id")
            .map_err(|e| DomainError::storage(format!("Failed to read id: {}", e)))?,
        question_text: row
            .try_get("question_text")
            .map_err(|e| DomainError::storage(format!("Failed to read question_text: {}", e)))?,
        cache_entry_id: row
            .try_get("vector_data_id")
            .map_err(|e| DomainError::storage(format!("Failed to read vector_data_id: {}", e)))?,
    })
}
