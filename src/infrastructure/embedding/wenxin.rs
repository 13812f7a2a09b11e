//! Baidu Wenxin (ERNIE) embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::http_client::HttpClientTrait;

pub const DEFAULT_WENXIN_URL: &str =
    "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/embeddings/embedding-v1";

/// Wenxin embedding endpoint authenticated with an access token query parameter
#[derive(Debug)]
pub struct WenxinEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    url: String,
    access_token: String,
}

impl<C: HttpClientTrait> WenxinEmbeddingProvider<C> {
    pub fn new(client: C, access_token: impl Into<String>) -> Self {
        Self::with_url(client, DEFAULT_WENXIN_URL, access_token)
    }

    pub fn with_url(client: C, url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            access_token: access_token.into(),
        }
    }

    fn request_url(&self) -> String {
        format!("{}?access_token={}", self.url, self.access_token)
    }

    /// Vectors of all returned items are concatenated in order
    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f64>, DomainError> {
        let response: WenxinEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("wenxin", format!("Failed to parse embedding response: {}", e))
        })?;

        if let Some(code) = response.error_code {
            return Err(DomainError::provider(
                "wenxin",
                format!(
                    "API error {}: {}",
                    code,
                    response.error_msg.unwrap_or_default()
                ),
            ));
        }

        let vector: Vec<f64> = response
            .data
            .into_iter()
            .flat_map(|item| item.embedding)
            .collect();

        if vector.is_empty() {
            return Err(DomainError::provider("wenxin", "Response contained no embedding"));
        }

        Ok(vector)
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for WenxinEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, DomainError> {
        let body = serde_json::json!({ "input": [text] });

        let response = self
            .client
            .post_json(
                &self.request_url(),
                vec![("Content-Type", "application/json")],
                &body,
            )
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "wenxin"
    }
}

#[derive(Debug, Deserialize)]
struct WenxinEmbeddingResponse {
    #[serde(default)]
    data: Vec<WenxinEmbeddingData>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WenxinEmbeddingData {
    #[serde(default)]
    embedding: Vec<f64>,
}
