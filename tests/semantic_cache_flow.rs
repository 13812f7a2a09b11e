//! End-to-end cache and blocklist flow on in-memory stores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use relay_cache::domain::semantic_cache::{CacheLookup, VectorTable};
use relay_cache::domain::{DomainError, EmbeddingProvider};
use relay_cache::infrastructure::semantic_cache::{InMemoryQaStore, InMemoryVectorStore};
use relay_cache::infrastructure::services::{GateDecision, RelayGate};
use relay_cache::{build_relay_gate, AppConfig, GateStores};

/// Provider returning fixed vectors per text
#[derive(Debug, Default)]
struct FixedEmbeddings {
    vectors: HashMap<String, Vec<f64>>,
}

impl FixedEmbeddings {
    fn with(mut self, text: &str, vector: &[f64]) -> Self {
        self.vectors.insert(text.to_string(), vector.to_vec());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, DomainError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| DomainError::provider("fixed", format!("no vector for {}", text)))
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.cache = config
        .cache
        .with_binarize_threshold(0.5)
        .with_buckets(1.0, 10)
        .with_match_threshold(0)
        .with_reuse_chance(100);
    config
}

fn in_memory_stores() -> GateStores {
    GateStores {
        cache_entries: Arc::new(InMemoryVectorStore::new(VectorTable::CacheEntries)),
        sensitive_phrases: Arc::new(InMemoryVectorStore::new(VectorTable::SensitivePhrases)),
        answers: Arc::new(InMemoryQaStore::new()),
    }
}

fn gate(config: &AppConfig, provider: FixedEmbeddings) -> RelayGate {
    build_relay_gate(config, Arc::new(provider), in_memory_stores()).unwrap()
}

#[tokio::test]
async fn hello_is_answered_from_cache() {
    let gate = gate(&config(), FixedEmbeddings::default());
    let cache = gate.cache();

    let entry_id = cache.insert_vector_data("hello", &[1.0, 0.0, 2.0]).await.unwrap();
    cache.insert_qa_entry("hello", "hi!", entry_id).await.unwrap();

    let (texts, ids) = cache
        .search_for_single_vector(&[0.9, 0.1, 1.8], 0)
        .await
        .unwrap();
    assert_eq!(texts, vec!["hello"]);
    assert_eq!(ids, vec![entry_id]);

    let lookup = cache.lookup("hello again", &[0.9, 0.1, 1.8]).await.unwrap();
    assert_eq!(lookup.answer(), Some("hi!"));
    assert_eq!(lookup.entry_id(), entry_id);
}

#[tokio::test]
async fn gate_round_trip_through_remember() {
    let provider = FixedEmbeddings::default()
        .with("what is rust?", &[1.0, 0.0, 2.0])
        .with("what's rust?", &[0.9, 0.1, 1.8]);
    let gate = gate(&config(), provider);

    let GateDecision::Proceed { ticket } = gate.screen("what is rust?").await.unwrap() else {
        panic!("an empty cache cannot answer");
    };
    gate.remember("what is rust?", "A systems language.", ticket)
        .await
        .unwrap();

    let decision = gate.screen("what's rust?").await.unwrap();

    assert!(matches!(
        decision,
        GateDecision::Answered { ref answer, .. } if answer == "A systems language."
    ));
    let stats = gate.cache().stats().await.unwrap();
    assert_eq!(stats.cache_entries, 1);
    assert_eq!(stats.questions, 1);
    assert_eq!(stats.answers, 1);
}

#[tokio::test]
async fn zero_chance_keeps_matched_entry_for_new_answer() {
    let mut config = config();
    config.cache = config.cache.with_reuse_chance(0);
    let provider = FixedEmbeddings::default()
        .with("hello", &[1.0, 0.0, 2.0])
        .with("hello!", &[0.9, 0.1, 1.8]);
    let gate = gate(&config, provider);

    let GateDecision::Proceed { ticket: first } = gate.screen("hello").await.unwrap() else {
        panic!("expected proceed");
    };
    gate.remember("hello", "hi!", first).await.unwrap();

    let GateDecision::Proceed { ticket: second } = gate.screen("hello!").await.unwrap() else {
        panic!("zero chance must never reuse");
    };

    assert_eq!(first, second);
    assert_eq!(gate.cache().stats().await.unwrap().cache_entries, 1);
}

#[tokio::test]
async fn identical_fingerprints_in_other_buckets_do_not_match() {
    let gate = gate(&config(), FixedEmbeddings::default());
    let cache = gate.cache();

    cache.insert_vector_data("short", &[1.0, 0.0, 1.0]).await.unwrap();

    // Same bits, norm 5 instead of 1.4
    let lookup = cache.lookup("long", &[3.0, 0.0, 4.0]).await.unwrap();

    assert!(matches!(lookup, CacheLookup::Stored { .. }));
    assert_eq!(cache.stats().await.unwrap().cache_entries, 2);
}

#[tokio::test]
async fn blocklisted_phrase_is_blocked_before_cache() {
    let mut config = config();
    config.sensitive = config
        .sensitive
        .with_enabled(true)
        .with_match_threshold(0)
        .with_safe_responses(vec!["Let's talk about something else.".to_string()]);
    let provider = FixedEmbeddings::default()
        .with("forbidden topic", &[-1.0, 2.0, -1.0])
        .with("a forbidden topic", &[-1.0, 2.1, -0.9]);
    let gate = gate(&config, provider);

    let report = gate.sensitive().ingest_phrase("forbidden topic").await.unwrap();
    assert_eq!(report.stored, 1);

    let decision = gate.screen("a forbidden topic").await.unwrap();

    assert_eq!(
        decision,
        GateDecision::Blocked {
            matched_text: Some("forbidden topic".to_string()),
            reply: Some("Let's talk about something else.".to_string()),
        }
    );
    assert_eq!(gate.cache().stats().await.unwrap().cache_entries, 0);
}
