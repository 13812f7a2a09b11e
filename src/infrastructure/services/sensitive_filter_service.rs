//! Vector blocklist service
//!
//! Blocks incoming text whose embedding lands within the Hamming threshold
//! of a stored phrase. The phrase table is filled by an offline ingestion
//! step, never from the request path.

use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::semantic_cache_service::embed_text;
use crate::domain::semantic_cache::{SensitiveFilterConfig, SensitiveVerdict, VectorIndex, VectorTable};
use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::metrics::record_sensitive_check;

/// Counts from one phrase file ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Non-blank lines read
    pub phrases: u64,
    /// Rows inserted
    pub stored: u64,
    /// Embeddings whose `(text, bucket)` was already stored
    pub skipped: u64,
}

#[derive(Debug)]
pub struct SensitiveFilterService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    config: SensitiveFilterConfig,
    print_vector: bool,
}

impl SensitiveFilterService {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        config: SensitiveFilterConfig,
    ) -> Result<Self, DomainError> {
        if index.table() != VectorTable::SensitivePhrases {
            return Err(DomainError::configuration(format!(
                "sensitive filter needs the {} table, got {}",
                VectorTable::SensitivePhrases.table_name(),
                index.table().table_name()
            )));
        }

        Ok(Self {
            embedding_provider,
            index,
            config,
            print_vector: false,
        })
    }

    pub fn with_print_vector(mut self, print_vector: bool) -> Self {
        self.print_vector = print_vector;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check an already computed embedding against the blocklist
    pub async fn intercept_sensitive_content(
        &self,
        vector: &[f64],
    ) -> Result<SensitiveVerdict, DomainError> {
        let matches = self.index.search(vector, self.config.match_threshold).await?;

        let verdict = match matches.into_iter().next() {
            Some(best) => {
                info!(
                    matched = %best.text,
                    distance = best.distance,
                    threshold = self.config.match_threshold,
                    "Blocked sensitive content"
                );
                SensitiveVerdict {
                    blocked: true,
                    matched_text: Some(best.text),
                    reply: self.safe_reply(),
                }
            }
            None => SensitiveVerdict::clear(),
        };

        record_sensitive_check(verdict.blocked);
        Ok(verdict)
    }

    /// Embed text, then check it
    pub async fn check_text(&self, text: &str) -> Result<SensitiveVerdict, DomainError> {
        let vector = embed_text(self.embedding_provider.as_ref(), text, self.print_vector).await?;
        self.intercept_sensitive_content(&vector).await
    }

    /// Random non-blank safe response
    pub fn safe_reply(&self) -> Option<String> {
        let candidates: Vec<&String> = self
            .config
            .safe_responses
            .iter()
            .filter(|reply| !reply.trim().is_empty())
            .collect();

        candidates
            .choose(&mut rand::thread_rng())
            .map(|reply| (*reply).clone())
    }

    /// Embed a phrase `samples_per_phrase` times and store every
    /// `(text, bucket)` pair not already present
    pub async fn ingest_phrase(&self, phrase: &str) -> Result<IngestReport, DomainError> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Ok(IngestReport::default());
        }

        let mut report = IngestReport {
            phrases: 1,
            ..IngestReport::default()
        };

        for attempt in 1..=self.config.samples_per_phrase.max(1) {
            let vector =
                embed_text(self.embedding_provider.as_ref(), phrase, self.print_vector).await?;

            if self.index.contains(phrase, &vector).await? {
                debug!(phrase, attempt, "Phrase already stored in this bucket");
                report.skipped += 1;
                continue;
            }

            let id = self.index.insert(phrase, &vector).await?;
            info!(phrase, id, attempt, "Stored sensitive phrase");
            report.stored += 1;
        }

        Ok(report)
    }

    /// Ingest a phrase file, one phrase per line.
    ///
    /// A missing file is created empty. Any embedding or store failure
    /// aborts the run; phrases stored so far stay stored.
    pub async fn ingest_phrase_file(&self, path: impl AsRef<Path>) -> Result<IngestReport, DomainError> {
        let path = path.as_ref();

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::write(path, "").await.map_err(|e| {
                    DomainError::internal(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                warn!(path = %path.display(), "Phrase file not found; created an empty one");
                return Ok(IngestReport::default());
            }
            Err(e) => {
                return Err(DomainError::internal(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut total = IngestReport::default();
        for line in contents.lines() {
            let report = self.ingest_phrase(line).await?;
            total.phrases += report.phrases;
            total.stored += report.stored;
            total.skipped += report.skipped;
        }

        info!(
            path = %path.display(),
            phrases = total.phrases,
            stored = total.stored,
            skipped = total.skipped,
            "Phrase file ingested"
        );

        Ok(total)
    }

    /// Rows in the blocklist table
    pub async fn phrase_count(&self) -> Result<u64, DomainError> {
        self.index.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::semantic_cache::SemanticCacheConfig;
    use crate::infrastructure::semantic_cache::InMemoryVectorStore;

    fn service(provider: MockEmbeddingProvider, config: SensitiveFilterConfig) -> SensitiveFilterService {
        let index = SemanticCacheConfig::new()
            .with_buckets(1.0, 10)
            .vector_index(Arc::new(InMemoryVectorStore::new(VectorTable::SensitivePhrases)))
            .unwrap();

        SensitiveFilterService::new(Arc::new(provider), index, config).unwrap()
    }

    fn enabled() -> SensitiveFilterConfig {
        SensitiveFilterConfig::new()
            .with_enabled(true)
            .with_match_threshold(0)
    }

    #[tokio::test]
    async fn test_blocks_stored_phrase() {
        let provider = MockEmbeddingProvider::new(8).with_vector("forbidden", vec![1.0, -1.0, 1.0]);
        let service = service(
            provider,
            enabled().with_safe_responses(vec!["Let's change the subject.".to_string()]),
        );
        service.ingest_phrase("forbidden").await.unwrap();

        let verdict = service
            .intercept_sensitive_content(&[1.0, -1.0, 1.0])
            .await
            .unwrap();

        assert!(verdict.blocked);
        assert_eq!(verdict.matched_text.as_deref(), Some("forbidden"));
        assert_eq!(verdict.reply.as_deref(), Some("Let's change the subject."));
    }

    #[tokio::test]
    async fn test_clear_when_nothing_matches() {
        let provider = MockEmbeddingProvider::new(8).with_vector("forbidden", vec![1.0, -1.0, 1.0]);
        let service = service(provider, enabled());
        service.ingest_phrase("forbidden").await.unwrap();

        let verdict = service
            .intercept_sensitive_content(&[-1.0, 1.0, -1.0])
            .await
            .unwrap();

        assert_eq!(verdict, SensitiveVerdict::clear());
    }

    #[tokio::test]
    async fn test_check_text_embeds_and_checks() {
        let provider = MockEmbeddingProvider::new(8)
            .with_vector("forbidden", vec![1.0, -1.0, 1.0])
            .with_vector("forbidden!", vec![0.9, -1.1, 1.0])
            .with_vector("hello", vec![-1.0, 1.0, -1.0]);
        let service = service(provider, enabled());
        service.ingest_phrase("forbidden").await.unwrap();

        let blocked = service.check_text("forbidden!").await.unwrap();
        let clear = service.check_text("hello").await.unwrap();

        assert!(blocked.blocked);
        assert_eq!(blocked.matched_text.as_deref(), Some("forbidden"));
        assert_eq!(clear, SensitiveVerdict::clear());
    }

    #[tokio::test]
    async fn test_blank_safe_responses_give_no_reply() {
        let service = service(
            MockEmbeddingProvider::new(8),
            enabled().with_safe_responses(vec!["  ".to_string(), String::new()]),
        );

        assert_eq!(service.safe_reply(), None);
    }

    #[tokio::test]
    async fn test_ingest_phrase_is_idempotent() {
        let service = service(MockEmbeddingProvider::new(8), enabled().with_samples_per_phrase(3));

        let first = service.ingest_phrase("forbidden").await.unwrap();
        let second = service.ingest_phrase("forbidden").await.unwrap();

        // The mock is deterministic, so only the first sample is new
        assert_eq!(first, IngestReport { phrases: 1, stored: 1, skipped: 2 });
        assert_eq!(second, IngestReport { phrases: 1, stored: 0, skipped: 3 });
        assert_eq!(service.phrase_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_phrase_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "first\n\n  \nsecond\nfirst\n").unwrap();
        let service = service(MockEmbeddingProvider::new(8), enabled());

        let report = service.ingest_phrase_file(&path).await.unwrap();

        assert_eq!(report, IngestReport { phrases: 3, stored: 2, skipped: 1 });
        assert_eq!(service.phrase_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_phrase_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_sensitive.txt");
        let service = service(MockEmbeddingProvider::new(8), enabled());

        let report = service.ingest_phrase_file(&path).await.unwrap();

        assert_eq!(report, IngestReport::default());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_ingestion() {
        let service = service(MockEmbeddingProvider::new(8).with_error("quota exceeded"), enabled());

        let result = service.ingest_phrase("forbidden").await;

        assert!(result.unwrap_err().is_provider());
    }

    #[test]
    fn test_rejects_cache_table() {
        let index = SemanticCacheConfig::new()
            .vector_index(Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries)))
            .unwrap();

        let result = SensitiveFilterService::new(
            Arc::new(MockEmbeddingProvider::new(8)),
            index,
            SensitiveFilterConfig::new(),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
