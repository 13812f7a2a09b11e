//! OpenAI-compatible embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Any endpoint speaking the OpenAI `/v1/embeddings` protocol
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    /// Create a new OpenAI embedding provider
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create a new provider with custom base URL
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f64>, DomainError> {
        let response: OpenAiEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse embedding response: {}", e))
        })?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| DomainError::provider("openai", "Response contained no embedding"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, DomainError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/embeddings";

    fn create_mock_response(dimensions: usize) -> serde_json::Value {
        let embedding: Vec<f64> = (0..dimensions).map(|j| j as f64 * 0.001).collect();

        serde_json::json!({
            "object": "list",
            "model": "text-embedding-3-small",
            "data": [{ "index": 0, "embedding": embedding, "object": "embedding" }],
            "usage": { "prompt_tokens": 2, "total_tokens": 2 }
        })
    }

    #[tokio::test]
    async fn test_embed_single_text() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(1536));
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key");

        let vector = provider.embed("Hello world").await.unwrap();

        assert_eq!(vector.len(), 1536);
        assert_eq!(vector[1], 0.001);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(4));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key").with_model("bge-small");

        provider.embed("Hello").await.unwrap();

        let requests = provider.client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("Authorization"), Some("Bearer test-api-key"));
        assert_eq!(requests[0].body["model"], "bge-small");
        assert_eq!(requests[0].body["input"], "Hello");
    }

    #[tokio::test]
    async fn test_empty_data_is_provider_error() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({ "data": [] }));
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key");

        let result = provider.embed("Hello").await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_embed_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "Rate limit exceeded");
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key");

        let result = provider.embed("Hello").await;

        assert!(result.unwrap_err().is_provider());
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/embeddings";
        let client = MockHttpClient::new().with_response(custom_url, create_mock_response(8));
        let provider =
            OpenAiEmbeddingProvider::with_base_url(client, "test-key", "http://localhost:8080/");

        assert_eq!(provider.embed("Test").await.unwrap().len(), 8);
        assert_eq!(provider.provider_name(), "openai");
    }
}
