//! Store traits and record types for the semantic cache

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Fingerprint;
use crate::domain::DomainError;

/// The two tables sharing the fingerprint schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorTable {
    /// Cached questions (`vector_data`)
    CacheEntries,
    /// Blocklisted phrases (`sensitive_words`)
    SensitivePhrases,
}

impl VectorTable {
    /// Backing table name
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::CacheEntries => "vector_data",
            Self::SensitivePhrases => "sensitive_words",
        }
    }
}

/// A fingerprint ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub text: String,
    pub fingerprint: Fingerprint,
    pub norm: f64,
    pub bucket_id: i64,
}

/// A stored fingerprint as returned by a bucket scan
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: i64,
    pub text: String,
    pub fingerprint: Fingerprint,
}

/// A distinct question text tied to the cache entry it was first seen with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub cache_entry_id: i64,
}

/// Row counts across the cache tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticCacheStats {
    /// Rows in `vector_data`
    pub cache_entries: u64,
    /// Rows in `questions`
    pub questions: u64,
    /// Rows in `qa_cache`
    pub answers: u64,
}

/// Persistence of fingerprints for one table.
///
/// Entries are append-only: nothing is updated or evicted.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Which table this store writes to
    fn table(&self) -> VectorTable;

    /// Insert an entry and return its id
    async fn insert(&self, entry: CacheEntry) -> Result<i64, DomainError>;

    /// All rows of one bucket, in insertion order
    async fn scan_bucket(&self, bucket_id: i64) -> Result<Vec<VectorRecord>, DomainError>;

    /// Whether an identical `(text, bucket)` pair is already stored
    async fn contains(&self, text: &str, bucket_id: i64) -> Result<bool, DomainError>;

    /// Number of stored rows
    async fn count(&self) -> Result<u64, DomainError>;
}

/// Persistence of questions and their answers
#[async_trait]
pub trait QaStore: Send + Sync + Debug {
    /// Look up a question by its exact text.
    ///
    /// Store-level lookup for inspection; the cache service itself goes
    /// through `get_or_create_question` and `random_answer`.
    async fn find_question(&self, question_text: &str) -> Result<Option<Question>, DomainError>;

    /// Atomically return the existing question or create it.
    ///
    /// An existing question keeps its original cache entry id.
    async fn get_or_create_question(
        &self,
        question_text: &str,
        cache_entry_id: i64,
    ) -> Result<Question, DomainError>;

    /// Attach an answer to a question, returning the answer id
    async fn insert_answer(&self, question_id: i64, answer_text: &str)
        -> Result<i64, DomainError>;

    /// Uniformly random answer among those stored for a question text
    async fn random_answer(&self, question_text: &str) -> Result<Option<String>, DomainError>;

    /// `(questions, answers)` row counts
    async fn counts(&self) -> Result<(u64, u64), DomainError>;
}
