//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding providers (Hunyuan, Wenxin, OpenAI-compatible)
///
/// The returned vector length is provider-dependent and is never checked
/// against a fixed dimension by the cache.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f64>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
