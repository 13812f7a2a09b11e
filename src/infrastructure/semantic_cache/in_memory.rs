//! In-memory semantic cache stores

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::domain::semantic_cache::{
    CacheEntry, QaStore, Question, VectorRecord, VectorStore, VectorTable,
};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
struct StoredVector {
    id: i64,
    entry: CacheEntry,
}

/// In-memory vector table
///
/// Suitable for tests and dry runs. For production use PostgresVectorStore.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    table: VectorTable,
    rows: RwLock<Vec<StoredVector>>,
    next_id: AtomicI64,
}

impl InMemoryVectorStore {
    pub fn new(table: VectorTable) -> Self {
        Self {
            table,
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Stored entry by id
    pub fn get(&self, id: i64) -> Option<CacheEntry> {
        self.rows
            .read()
            .ok()?
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.entry.clone())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn table(&self) -> VectorTable {
        self.table
    }

    async fn insert(&self, entry: CacheEntry) -> Result<i64, DomainError> {
        let mut rows = self.rows.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rows.push(StoredVector { id, entry });

        Ok(id)
    }

    async fn scan_bucket(&self, bucket_id: i64) -> Result<Vec<VectorRecord>, DomainError> {
        let rows = self.rows.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(rows
            .iter()
            .filter(|row| row.entry.bucket_id == bucket_id)
            .map(|row| VectorRecord {
                id: row.id,
                text: row.entry.text.clone(),
                fingerprint: row.entry.fingerprint.clone(),
            })
            .collect())
    }

    async fn contains(&self, text: &str, bucket_id: i64) -> Result<bool, DomainError> {
        let rows = self.rows.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(rows
            .iter()
            .any(|row| row.entry.text == text && row.entry.bucket_id == bucket_id))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let rows = self.rows.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(rows.len() as u64)
    }
}

#[derive(Debug, Default)]
struct QaTables {
    questions: Vec<Question>,
    answers: Vec<(i64, i64, String)>,
}

/// In-memory questions and answers
///
/// A single lock guards both tables, so get-or-create is atomic.
#[derive(Debug)]
pub struct InMemoryQaStore {
    tables: RwLock<QaTables>,
    next_question_id: AtomicI64,
    next_answer_id: AtomicI64,
}

impl InMemoryQaStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(QaTables::default()),
            next_question_id: AtomicI64::new(1),
            next_answer_id: AtomicI64::new(1),
        }
    }

    /// All answers stored for a question text
    pub fn answers_for(&self, question_text: &str) -> Vec<String> {
        let Ok(tables) = self.tables.read() else {
            return Vec::new();
        };

        let Some(question) = tables
            .questions
            .iter()
            .find(|q| q.question_text == question_text)
        else {
            return Vec::new();
        };

        tables
            .answers
            .iter()
            .filter(|(_, question_id, _)| *question_id == question.id)
            .map(|(_, _, text)| text.clone())
            .collect()
    }
}

impl Default for InMemoryQaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QaStore for InMemoryQaStore {
    async fn find_question(&self, question_text: &str) -> Result<Option<Question>, DomainError> {
        let tables = self.tables.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(tables
            .questions
            .iter()
            .find(|q| q.question_text == question_text)
            .cloned())
    }

    async fn get_or_create_question(
        &self,
        question_text: &str,
        cache_entry_id: i64,
    ) -> Result<Question, DomainError> {
        let mut tables = self.tables.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        if let Some(existing) = tables
            .questions
            .iter()
            .find(|q| q.question_text == question_text)
        {
            return Ok(existing.clone());
        }

        let question = Question {
            id: self.next_question_id.fetch_add(1, Ordering::SeqCst),
            question_text: question_text.to_string(),
            cache_entry_id,
        };
        tables.questions.push(question.clone());

        Ok(question)
    }

    async fn insert_answer(
        &self,
        question_id: i64,
        answer_text: &str,
    ) -> Result<i64, DomainError> {
        let mut tables = self.tables.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        if !tables.questions.iter().any(|q| q.id == question_id) {
            return Err(DomainError::storage(format!(
                "Question {} does not exist",
                question_id
            )));
        }

        let id = self.next_answer_id.fetch_add(1, Ordering::SeqCst);
        tables
            .answers
            .push((id, question_id, answer_text.to_string()));

        Ok(id)
    }

    async fn random_answer(&self, question_text: &str) -> Result<Option<String>, DomainError> {
        let tables = self.tables.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let Some(question) = tables
            .questions
            .iter()
            .find(|q| q.question_text == question_text)
        else {
            return Ok(None);
        };

        let candidates: Vec<&String> = tables
            .answers
            .iter()
            .filter(|(_, question_id, _)| *question_id == question.id)
            .map(|(_, _, text)| text)
            .collect();

        Ok(candidates
            .choose(&mut rand::thread_rng())
            .map(|text| (*text).clone()))
    }

    async fn counts(&self) -> Result<(u64, u64), DomainError> {
        let tables = self.tables.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok((tables.questions.len() as u64, tables.answers.len() as u64))
    }
}
