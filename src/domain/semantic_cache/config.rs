//! Semantic cache and sensitive filter configuration

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BucketAssigner, ReuseChance, VectorIndex, VectorStore};
use crate::domain::DomainError;

/// Configuration for the semantic response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Whether the cache is consulted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Element threshold used to binarize embeddings
    #[serde(default)]
    pub binarize_threshold: f64,

    /// Bucket scale constant `k`
    #[serde(default = "default_bucket_scale")]
    pub bucket_scale: f64,

    /// Bucket count `N`
    #[serde(default = "default_bucket_count")]
    pub bucket_count: i64,

    /// Maximum Hamming distance for a match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u32,

    /// Percentage of hits that reuse a stored answer (0 to 100)
    #[serde(default = "default_reuse_chance")]
    pub reuse_chance: u8,

    /// Log norms, bucket ids and distances at info level
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool {
    true
}

fn default_bucket_scale() -> f64 {
    10.0
}

fn default_bucket_count() -> i64 {
    1000
}

fn default_match_threshold() -> u32 {
    8
}

fn default_reuse_chance() -> u8 {
    50
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            binarize_threshold: 0.0,
            bucket_scale: default_bucket_scale(),
            bucket_count: default_bucket_count(),
            match_threshold: default_match_threshold(),
            reuse_chance: default_reuse_chance(),
            debug: false,
        }
    }
}

impl SemanticCacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validated bucket assigner for `(bucket_scale, bucket_count)`
    pub fn bucket_assigner(&self) -> Result<BucketAssigner, DomainError> {
        BucketAssigner::new(self.bucket_scale, self.bucket_count)
    }

    /// Validated reuse chance
    pub fn reuse_chance(&self) -> Result<ReuseChance, DomainError> {
        ReuseChance::new(self.reuse_chance)
    }

    /// Index over `store` using this quantizer and bucket setup.
    ///
    /// The blocklist is indexed with the same settings as the cache.
    pub fn vector_index(&self, store: Arc<dyn VectorStore>) -> Result<VectorIndex, DomainError> {
        Ok(VectorIndex::new(store, self.binarize_threshold, self.bucket_assigner()?)
            .with_debug(self.debug))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_binarize_threshold(mut self, threshold: f64) -> Self {
        self.binarize_threshold = threshold;
        self
    }

    /// Set the bucket scale `k` and count `N`
    pub fn with_buckets(mut self, scale: f64, count: i64) -> Self {
        self.bucket_scale = scale;
        self.bucket_count = count;
        self
    }

    pub fn with_match_threshold(mut self, threshold: u32) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Set the reuse chance, clamped to 100
    pub fn with_reuse_chance(mut self, percent: u8) -> Self {
        self.reuse_chance = percent.min(100);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Configuration for the vector blocklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveFilterConfig {
    /// Whether incoming text is checked against the blocklist
    #[serde(default)]
    pub enabled: bool,

    /// Maximum Hamming distance for a blocklist match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u32,

    /// Phrase list read by the offline ingestion step, one phrase per line
    #[serde(default = "default_phrase_file")]
    pub phrase_file: String,

    /// Embeddings computed per phrase during ingestion; providers that are
    /// not fully deterministic can place one phrase in several buckets
    #[serde(default = "default_samples_per_phrase")]
    pub samples_per_phrase: u32,

    /// Replies sent instead of an answer when a message is blocked
    #[serde(default)]
    pub safe_responses: Vec<String>,
}

fn default_phrase_file() -> String {
    "vector_sensitive.txt".to_string()
}

fn default_samples_per_phrase() -> u32 {
    1
}

impl Default for SensitiveFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            match_threshold: default_match_threshold(),
            phrase_file: default_phrase_file(),
            samples_per_phrase: default_samples_per_phrase(),
            safe_responses: Vec::new(),
        }
    }
}

impl SensitiveFilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_match_threshold(mut self, threshold: u32) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_phrase_file(mut self, path: impl Into<String>) -> Self {
        self.phrase_file = path.into();
        self
    }

    pub fn with_samples_per_phrase(mut self, samples: u32) -> Self {
        self.samples_per_phrase = samples.max(1);
        self
    }

    pub fn with_safe_responses(mut self, responses: Vec<String>) -> Self {
        self.safe_responses = responses;
        self
    }
}
