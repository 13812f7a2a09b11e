//! Embedding provider implementations

mod factory;
mod hunyuan;
mod openai;
mod wenxin;

pub use factory::EmbeddingProviderFactory;
pub use hunyuan::{HunyuanEmbeddingProvider, Tc3Signer, DEFAULT_HUNYUAN_ENDPOINT};
pub use openai::{OpenAiEmbeddingProvider, DEFAULT_OPENAI_MODEL};
pub use wenxin::{WenxinEmbeddingProvider, DEFAULT_WENXIN_URL};
