//! Semantic response cache service
//!
//! Wraps the embedding provider, the `vector_data` index and the
//! question/answer store, and runs the per-question reuse policy.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::semantic_cache::{
    CacheLookup, QaStore, ReuseChance, SearchMatch, SemanticCacheConfig, SemanticCacheStats,
    VectorIndex, VectorStore, VectorTable,
};
use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::metrics::{record_cache_lookup, record_embedding_request};

/// Semantic cache over quantized embeddings
#[derive(Debug)]
pub struct SemanticCacheService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    qa_store: Arc<dyn QaStore>,
    config: SemanticCacheConfig,
    reuse_chance: ReuseChance,
    print_vector: bool,
}

impl SemanticCacheService {
    /// Create the service, validating the bucket and reuse settings
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        qa_store: Arc<dyn QaStore>,
        config: SemanticCacheConfig,
    ) -> Result<Self, DomainError> {
        if vector_store.table() != VectorTable::CacheEntries {
            return Err(DomainError::configuration(format!(
                "semantic cache needs the {} table, got {}",
                VectorTable::CacheEntries.table_name(),
                vector_store.table().table_name()
            )));
        }

        let index = config.vector_index(vector_store)?;
        let reuse_chance = config.reuse_chance()?;

        Ok(Self {
            embedding_provider,
            index,
            qa_store,
            config,
            reuse_chance,
            print_vector: false,
        })
    }

    /// Log each computed embedding
    pub fn with_print_vector(mut self, print_vector: bool) -> Self {
        self.print_vector = print_vector;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Embed text with the configured provider
    pub async fn calculate_text_embedding(&self, text: &str) -> Result<Vec<f64>, DomainError> {
        embed_text(self.embedding_provider.as_ref(), text, self.print_vector).await
    }

    /// Store a new cache entry, returning its id
    pub async fn insert_vector_data(&self, text: &str, vector: &[f64]) -> Result<i64, DomainError> {
        self.index.insert(text, vector).await
    }

    /// Matches in the vector's bucket, best first
    pub async fn search(
        &self,
        vector: &[f64],
        threshold: u32,
    ) -> Result<Vec<SearchMatch>, DomainError> {
        self.index.search(vector, threshold).await
    }

    /// Matched texts and ids, position-aligned and best first
    pub async fn search_for_single_vector(
        &self,
        vector: &[f64],
        threshold: u32,
    ) -> Result<(Vec<String>, Vec<i64>), DomainError> {
        let matches = self.search(vector, threshold).await?;

        Ok(matches.into_iter().map(|m| (m.text, m.id)).unzip())
    }

    /// Attach an answer to a question, creating the question if needed
    pub async fn insert_qa_entry(
        &self,
        question: &str,
        answer: &str,
        cache_entry_id: i64,
    ) -> Result<i64, DomainError> {
        let question = self
            .qa_store
            .get_or_create_question(question, cache_entry_id)
            .await?;
        let answer_id = self.qa_store.insert_answer(question.id, answer).await?;

        debug!(
            question_id = question.id,
            answer_id,
            cache_entry_id = question.cache_entry_id,
            "Stored answer"
        );

        Ok(answer_id)
    }

    /// A uniformly random stored answer for the question
    pub async fn get_random_answer(&self, question: &str) -> Result<Option<String>, DomainError> {
        self.qa_store.random_answer(question).await
    }

    /// Run the reuse policy for one incoming question.
    ///
    /// A miss stores a new entry; a hit writes nothing.
    pub async fn lookup(&self, text: &str, vector: &[f64]) -> Result<CacheLookup, DomainError> {
        let matches = self.search(vector, self.config.match_threshold).await?;

        let lookup = match matches.into_iter().next() {
            Some(best) => self.resolve_hit(best).await,
            None => {
                let entry_id = self.insert_vector_data(text, vector).await?;
                CacheLookup::Stored { entry_id }
            }
        };

        record_cache_lookup(lookup.outcome());
        if self.config.debug {
            info!(outcome = lookup.outcome(), entry_id = lookup.entry_id(), "Cache lookup");
        } else {
            debug!(outcome = lookup.outcome(), entry_id = lookup.entry_id(), "Cache lookup");
        }

        Ok(lookup)
    }

    /// A failed answer fetch still keeps the matched entry id
    async fn resolve_hit(&self, best: SearchMatch) -> CacheLookup {
        if self.reuse_chance.roll() {
            match self.get_random_answer(&best.text).await {
                Ok(Some(answer)) => {
                    return CacheLookup::Reused {
                        answer,
                        matched_question: best.text,
                        entry_id: best.id,
                        distance: best.distance,
                    };
                }
                Ok(None) => debug!(
                    entry_id = best.id,
                    "Matched question has no stored answer"
                ),
                Err(e) => warn!(
                    entry_id = best.id,
                    "Failed to fetch a cached answer: {}", e
                ),
            }
        }

        CacheLookup::Matched {
            matched_question: best.text,
            entry_id: best.id,
            distance: best.distance,
        }
    }

    /// Row counts of the cache tables
    pub async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let cache_entries = self.index.count().await?;
        let (questions, answers) = self.qa_store.counts().await?;

        Ok(SemanticCacheStats {
            cache_entries,
            questions,
            answers,
        })
    }
}

/// Call the provider, recording metrics and rejecting empty vectors
pub(crate) async fn embed_text(
    provider: &dyn EmbeddingProvider,
    text: &str,
    print_vector: bool,
) -> Result<Vec<f64>, DomainError> {
    let started = Instant::now();
    let result = provider.embed(text).await.and_then(|vector| {
        if vector.is_empty() {
            Err(DomainError::provider(
                provider.provider_name(),
                "Provider returned an empty embedding",
            ))
        } else {
            Ok(vector)
        }
    });

    record_embedding_request(provider.provider_name(), result.is_ok(), started.elapsed());

    match result {
        Ok(vector) => {
            if print_vector {
                info!(provider = provider.provider_name(), dimensions = vector.len(), ?vector, "Embedding");
            }
            Ok(vector)
        }
        Err(e) => {
            warn!(provider = provider.provider_name(), "Embedding request failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::semantic_cache::Question;
    use crate::infrastructure::semantic_cache::{InMemoryQaStore, InMemoryVectorStore};

    /// Question/answer store whose answer reads always fail
    #[derive(Debug, Default)]
    struct UnreadableAnswers {
        inner: InMemoryQaStore,
    }

    #[async_trait]
    impl QaStore for UnreadableAnswers {
        async fn find_question(&self, question_text: &str) -> Result<Option<Question>, DomainError> {
            self.inner.find_question(question_text).await
        }

        async fn get_or_create_question(
            &self,
            question_text: &str,
            cache_entry_id: i64,
        ) -> Result<Question, DomainError> {
            self.inner.get_or_create_question(question_text, cache_entry_id).await
        }

        async fn insert_answer(&self, question_id: i64, answer_text: &str) -> Result<i64, DomainError> {
            self.inner.insert_answer(question_id, answer_text).await
        }

        async fn random_answer(&self, _question_text: &str) -> Result<Option<String>, DomainError> {
            Err(DomainError::storage("down"))
        }

        async fn counts(&self) -> Result<(u64, u64), DomainError> {
            self.inner.counts().await
        }
    }

    struct Fixture {
        service: SemanticCacheService,
        vectors: Arc<InMemoryVectorStore>,
        qa: Arc<InMemoryQaStore>,
    }

    fn fixture(config: SemanticCacheConfig) -> Fixture {
        let vectors = Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries));
        let qa = Arc::new(InMemoryQaStore::new());
        let service = SemanticCacheService::new(
            Arc::new(MockEmbeddingProvider::new(16)),
            vectors.clone(),
            qa.clone(),
            config,
        )
        .unwrap();

        Fixture {
            service,
            vectors,
            qa,
        }
    }

    fn config(reuse_chance: u8) -> SemanticCacheConfig {
        SemanticCacheConfig::new()
            .with_binarize_threshold(0.5)
            .with_buckets(1.0, 10)
            .with_match_threshold(0)
            .with_reuse_chance(reuse_chance)
    }

    #[tokio::test]
    async fn test_miss_stores_exactly_one_entry() {
        let f = fixture(config(100));

        let lookup = f.service.lookup("hello", &[1.0, 0.0, 2.0]).await.unwrap();

        let CacheLookup::Stored { entry_id } = lookup else {
            panic!("expected a stored entry, got {:?}", lookup);
        };
        assert_eq!(f.vectors.get(entry_id).unwrap().text, "hello");
        assert_eq!(f.service.stats().await.unwrap().cache_entries, 1);
    }

    #[tokio::test]
    async fn test_hit_with_full_chance_reuses_answer() {
        let f = fixture(config(100));
        let entry_id = f.service.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();
        f.service.insert_qa_entry("hello", "hi!", entry_id).await.unwrap();

        let lookup = f.service.lookup("hey there", &[0.9, 0.1, 1.8]).await.unwrap();

        assert_eq!(
            lookup,
            CacheLookup::Reused {
                answer: "hi!".to_string(),
                matched_question: "hello".to_string(),
                entry_id,
                distance: 0,
            }
        );
        assert_eq!(f.service.stats().await.unwrap().cache_entries, 1);
    }

    #[tokio::test]
    async fn test_zero_chance_never_reuses() {
        let f = fixture(config(0));
        let entry_id = f.service.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();
        f.service.insert_qa_entry("hello", "hi!", entry_id).await.unwrap();

        for _ in 0..50 {
            let lookup = f.service.lookup("hello", &[1.0, 0.0, 2.0]).await.unwrap();
            assert_eq!(
                lookup,
                CacheLookup::Matched {
                    matched_question: "hello".to_string(),
                    entry_id,
                    distance: 0,
                }
            );
        }
        assert_eq!(f.service.stats().await.unwrap().cache_entries, 1);
    }

    #[tokio::test]
    async fn test_hit_without_answers_falls_through() {
        let f = fixture(config(100));
        let entry_id = f.service.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();

        let lookup = f.service.lookup("hello", &[1.0, 0.0, 2.0]).await.unwrap();

        assert!(matches!(lookup, CacheLookup::Matched { entry_id: id, .. } if id == entry_id));
    }

    #[tokio::test]
    async fn test_failed_answer_fetch_keeps_matched_entry() {
        let service = SemanticCacheService::new(
            Arc::new(MockEmbeddingProvider::new(16)),
            Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries)),
            Arc::new(UnreadableAnswers::default()),
            config(100),
        )
        .unwrap();
        let entry_id = service.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();
        service.insert_qa_entry("hello", "hi!", entry_id).await.unwrap();

        let lookup = service.lookup("hello", &[1.0, 0.0, 2.0]).await.unwrap();

        assert_eq!(
            lookup,
            CacheLookup::Matched {
                matched_question: "hello".to_string(),
                entry_id,
                distance: 0,
            }
        );
        assert_eq!(service.stats().await.unwrap().cache_entries, 1);
    }

    #[tokio::test]
    async fn test_insert_qa_entry_reuses_question() {
        let f = fixture(config(100));
        let entry_id = f.service.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();

        f.service.insert_qa_entry("hello", "hi!", entry_id).await.unwrap();
        f.service.insert_qa_entry("hello", "hey", entry_id).await.unwrap();

        let stats = f.service.stats().await.unwrap();
        assert_eq!(stats.questions, 1);
        assert_eq!(stats.answers, 2);
        assert_eq!(f.qa.answers_for("hello"), vec!["hi!", "hey"]);
    }

    #[tokio::test]
    async fn test_search_for_single_vector_pairs_ids() {
        // Scale 0 puts every vector in bucket 0
        let f = fixture(
            SemanticCacheConfig::new()
                .with_binarize_threshold(0.0)
                .with_buckets(0.0, 10)
                .with_match_threshold(8),
        );
        let rows = [
            ("five", [-1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0]),
            ("one", [-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            ("three", [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
        ];
        let mut ids = Vec::new();
        for (text, vector) in rows {
            ids.push(f.service.insert_vector_data(text, &vector).await.unwrap());
        }

        let (texts, found) = f
            .service
            .search_for_single_vector(&[1.0; 8], 8)
            .await
            .unwrap();

        assert_eq!(texts, vec!["one", "three", "five"]);
        assert_eq!(found, vec![ids[1], ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_calculate_text_embedding_rejects_empty_vector() {
        let vectors = Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries));
        let service = SemanticCacheService::new(
            Arc::new(MockEmbeddingProvider::new(0)),
            vectors,
            Arc::new(InMemoryQaStore::new()),
            SemanticCacheConfig::new(),
        )
        .unwrap();

        let result = service.calculate_text_embedding("hello").await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_rejects_blocklist_table() {
        let result = SemanticCacheService::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(InMemoryVectorStore::new(VectorTable::SensitivePhrases)),
            Arc::new(InMemoryQaStore::new()),
            SemanticCacheConfig::new(),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_invalid_bucket_count_is_rejected() {
        let result = SemanticCacheService::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries)),
            Arc::new(InMemoryQaStore::new()),
            SemanticCacheConfig::new().with_buckets(10.0, 0),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
