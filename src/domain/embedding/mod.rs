//! Embedding provider domain models and traits

mod provider;

pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
