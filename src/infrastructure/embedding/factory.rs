//! Embedding provider factory

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{HunyuanEmbeddingProvider, OpenAiEmbeddingProvider, WenxinEmbeddingProvider};
use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::http_client::HttpClient;

/// Builds the configured embedding provider
#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    pub fn create(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;

        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            EmbeddingProviderType::Hunyuan => {
                let settings = &config.hunyuan;
                require("hunyuan.secret_id", &settings.secret_id)?;
                require("hunyuan.secret_key", &settings.secret_key)?;

                let provider = match settings.endpoint {
                    Some(ref endpoint) => HunyuanEmbeddingProvider::with_endpoint(
                        client,
                        &settings.secret_id,
                        &settings.secret_key,
                        endpoint,
                    ),
                    None => HunyuanEmbeddingProvider::new(
                        client,
                        &settings.secret_id,
                        &settings.secret_key,
                    ),
                };

                Arc::new(provider.with_region(&settings.region))
            }
            EmbeddingProviderType::Wenxin => {
                let settings = &config.wenxin;
                require("wenxin.access_token", &settings.access_token)?;

                Arc::new(match settings.url {
                    Some(ref url) => {
                        WenxinEmbeddingProvider::with_url(client, url, &settings.access_token)
                    }
                    None => WenxinEmbeddingProvider::new(client, &settings.access_token),
                })
            }
            EmbeddingProviderType::OpenAi => {
                let settings = &config.openai;
                require("openai.api_key", &settings.api_key)?;

                let provider = match settings.base_url {
                    Some(ref base_url) => {
                        OpenAiEmbeddingProvider::with_base_url(client, &settings.api_key, base_url)
                    }
                    None => OpenAiEmbeddingProvider::new(client, &settings.api_key),
                };

                Arc::new(match settings.model {
                    Some(ref model) => provider.with_model(model),
                    None => provider,
                })
            }
        };

        info!(provider = provider.provider_name(), "Embedding provider configured");

        Ok(provider)
    }
}

fn require(key: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::configuration(format!(
            "embedding.{} is required",
            key
        )));
    }
    Ok(())
}
