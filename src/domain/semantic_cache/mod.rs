//! Semantic cache domain models and traits
//!
//! Embeddings are binarized into fingerprints, partitioned into buckets by
//! magnitude, and matched by Hamming distance within one bucket. The same
//! engine backs both the response cache and the phrase blocklist.

mod bucket;
mod config;
mod fingerprint;
mod index;
mod policy;
mod repository;
mod search;

pub use bucket::{euclidean_norm, BucketAssigner, BucketPlacement};
pub use config::{SemanticCacheConfig, SensitiveFilterConfig};
pub use fingerprint::{hamming_distance, quantize, Fingerprint};
pub use index::VectorIndex;
pub use policy::{CacheLookup, ReuseChance, SensitiveVerdict};
pub use repository::{
    CacheEntry, QaStore, Question, SemanticCacheStats, VectorRecord, VectorStore, VectorTable,
};
pub use search::{rank_candidates, SearchMatch};
