//! Tencent Cloud Hunyuan embedding provider
//!
//! Calls the `GetEmbedding` action with TC3-HMAC-SHA256 signed requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::http_client::HttpClientTrait;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_HUNYUAN_ENDPOINT: &str = "hunyuan.tencentcloudapi.com";
const SERVICE: &str = "hunyuan";
const ACTION: &str = "GetEmbedding";
const API_VERSION: &str = "2023-09-01";
const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

/// Request signer for Tencent Cloud API v3
#[derive(Debug, Clone)]
pub struct Tc3Signer {
    secret_id: String,
    secret_key: String,
    host: String,
}

impl Tc3Signer {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            host: host.into(),
        }
    }

    /// `Authorization` header value for a JSON payload sent at `timestamp`
    pub fn authorization(&self, payload: &str, timestamp: i64) -> Result<String, DomainError> {
        let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or_else(|| DomainError::internal(format!("Invalid timestamp {}", timestamp)))?
            .format("%Y-%m-%d")
            .to_string();

        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
            CONTENT_TYPE,
            self.host,
            SIGNED_HEADERS,
            sha256_hex(payload)
        );

        let scope = format!("{}/{}/tc3_request", date, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            scope,
            sha256_hex(&canonical_request)
        );

        let secret_date = hmac_sha256(format!("TC3{}", self.secret_key).as_bytes(), &date)?;
        let secret_service = hmac_sha256(&secret_date, SERVICE)?;
        let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
        let signature = hex::encode(hmac_sha256(&secret_signing, &string_to_sign)?);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.secret_id, scope, SIGNED_HEADERS, signature
        ))
    }
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, DomainError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| DomainError::internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hunyuan `GetEmbedding` provider
#[derive(Debug)]
pub struct HunyuanEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    signer: Tc3Signer,
    endpoint: String,
    region: Option<String>,
}

impl<C: HttpClientTrait> HunyuanEmbeddingProvider<C> {
    pub fn new(client: C, secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::with_endpoint(client, secret_id, secret_key, DEFAULT_HUNYUAN_ENDPOINT)
    }

    /// Use another host, e.g. `hunyuan.ap-guangzhou.tencentcloudapi.com`
    pub fn with_endpoint(
        client: C,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Self {
            client,
            signer: Tc3Signer::new(secret_id, secret_key, host.clone()),
            endpoint: host,
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.region = (!region.is_empty()).then_some(region);
        self
    }

    fn url(&self) -> String {
        format!("https://{}/", self.endpoint)
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f64>, DomainError> {
        let envelope: HunyuanEnvelope = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("hunyuan", format!("Failed to parse embedding response: {}", e))
        })?;

        let response = envelope.response;
        if let Some(error) = response.error {
            return Err(DomainError::provider(
                "hunyuan",
                format!(
                    "API error {}: {} (request {})",
                    error.code,
                    error.message,
                    response.request_id.unwrap_or_default()
                ),
            ));
        }

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| DomainError::provider("hunyuan", "Response contained no embedding"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for HunyuanEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, DomainError> {
        let body = serde_json::json!({ "Input": text });
        // The signature covers the exact bytes the client serializes
        let payload = serde_json::to_string(&body).map_err(|e| {
            DomainError::internal(format!("Failed to serialize request: {}", e))
        })?;

        let timestamp = Utc::now().timestamp();
        let authorization = self.signer.authorization(&payload, timestamp)?;
        let timestamp = timestamp.to_string();

        let mut headers = vec![
            ("Authorization", authorization.as_str()),
            ("Content-Type", CONTENT_TYPE),
            ("X-TC-Action", ACTION),
            ("X-TC-Version", API_VERSION),
            ("X-TC-Timestamp", timestamp.as_str()),
        ];
        if let Some(ref region) = self.region {
            headers.push(("X-TC-Region", region.as_str()));
        }

        let response = self.client.post_json(&self.url(), headers, &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "hunyuan"
    }
}

#[derive(Debug, Deserialize)]
struct HunyuanEnvelope {
    #[serde(rename = "Response")]
    response: HunyuanResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HunyuanResponse {
    #[serde(default)]
    data: Vec<HunyuanEmbeddingData>,
    error: Option<HunyuanError>,
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HunyuanEmbeddingData {
    #[serde(default)]
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HunyuanError {
    code: String,
    message: String,
}
