//! HTTP embedding backend for OpenAI-compatible APIs
//!
//! This backend supports any OpenAI-compatible embedding API, including:
//! - OpenAI API
//! - Azure OpenAI
//! - Local servers (LM Studio, vLLM, Ollama with OpenAI compat, text-embeddings-inference)

use super::traits::{EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::types::Embedding;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the HTTP embedding backend
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API endpoint (e.g., "https://api.openai.com/v1/embeddings")
    pub endpoint: String,
    /// API key (optional, can be from env var)
    pub api_key: Option<String>,
    /// Model name (e.g., "text-embedding-3-small")
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum batch size for requests
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
            max_batch_size: 100,
        }
    }
}

/// HTTP embedding backend for OpenAI-compatible APIs
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    config: HttpConfig,
}

/// OpenAI embedding request format
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<&'a str>,
}

/// OpenAI embedding response format
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: usize,
}

/// OpenAI error response format
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl HttpBackend {
    /// Create a new HTTP embedding backend
    pub fn new(config: HttpConfig) -> EmbeddingResult<Self> {
        info!(
            "Initializing HTTP embedding backend: endpoint={}, model={}",
            config.endpoint, config.model
        );

        if config.max_batch_size == 0 {
            return Err(EmbeddingError::Config("max_batch_size must be positive".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Get API key from config or environment
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| EmbeddingError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") || config.endpoint.contains("azure.com") {
            warn!("No API key provided for {}", config.endpoint);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Make an embedding request to the API
    async fn request_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts.to_vec(),
            // Only text-embedding-3-* models accept a dimensions parameter
            dimensions: if self.config.model.contains("text-embedding-3") {
                Some(self.config.dimensions)
            } else {
                None
            },
            encoding_format: Some("float"),
        };

        debug!(
            "Sending embedding request to {} for {} texts",
            self.config.endpoint,
            texts.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000);

            return Err(EmbeddingError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(EmbeddingError::EmbeddingFailed(format!(
                    "API error ({}): {}",
                    status, error_response.error.message
                )));
            }

            return Err(EmbeddingError::EmbeddingFailed(format!(
                "HTTP error ({}): {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &embedding_response.usage {
            debug!("Embedding request used {} tokens", usage.total_tokens);
        }

        let mut data = embedding_response.data;
        if data.len() != texts.len() {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.len() != self.config.dimensions {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.config.dimensions,
                        actual: d.embedding.len(),
                    });
                }
                Ok(normalize_embedding(&d.embedding))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingBackend for HttpBackend {
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let embeddings = self.request_embeddings(&[text]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in text_refs.chunks(self.config.max_batch_size) {
            all_embeddings.extend(self.request_embeddings(chunk).await?);
        }
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Normalize an embedding vector to unit length
pub(crate) fn normalize_embedding(embedding: &[f32]) -> Embedding {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter().map(|x| x / norm).collect()
    } else {
        embedding.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_batch_size, 100);
    }

    #[test]
    fn test_normalize_embedding() {
        let normalized = normalize_embedding(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize_embedding(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = HttpConfig {
            max_batch_size: 0,
            ..HttpConfig::default()
        };
        assert!(matches!(HttpBackend::new(config), Err(EmbeddingError::Config(_))));
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "m",
            input: vec!["a", "b"],
            dimensions: None,
            encoding_format: Some("float"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"], serde_json::json!(["a", "b"]));
        assert!(json.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let backend = HttpBackend::new(HttpConfig {
            endpoint: "http://127.0.0.1:9/v1/embeddings".to_string(),
            timeout_secs: 2,
            dimensions: 4,
            ..HttpConfig::default()
        })
        .unwrap();
        assert!(backend.embed("query").await.is_err());
    }
}
