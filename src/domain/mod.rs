//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod semantic_cache;

pub use embedding::EmbeddingProvider;
pub use error::DomainError;
pub use semantic_cache::{
    quantize, hamming_distance, BucketAssigner, BucketPlacement, CacheEntry, CacheLookup,
    Fingerprint, QaStore, Question, ReuseChance, SearchMatch, SemanticCacheConfig,
    SemanticCacheStats, SensitiveFilterConfig, SensitiveVerdict, VectorIndex, VectorRecord,
    VectorStore, VectorTable,
};
