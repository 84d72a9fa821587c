//! Embedding backend configuration

use serde::{Deserialize, Serialize};

/// Default timeout for HTTP backend requests
fn default_timeout() -> u64 {
    30
}

/// Default batch size for HTTP backend requests
fn default_batch_size() -> usize {
    100
}

fn default_dimensions() -> usize {
    384
}

fn default_backend() -> String {
    "hash".to_string()
}

/// Resolved backend configuration for embedding providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// OpenAI-compatible HTTP endpoint
    ///
    /// Works with: OpenAI API, Azure OpenAI, LM Studio, vLLM,
    /// Ollama (OpenAI compat mode), text-embeddings-inference
    Http {
        /// API endpoint URL (e.g., "https://api.openai.com/v1/embeddings")
        endpoint: String,
        /// API key (optional, can also use OPENAI_API_KEY env var)
        #[serde(default)]
        api_key: Option<String>,
        /// Model name (e.g., "text-embedding-3-small")
        model: String,
        /// Embedding dimensions
        dimensions: usize,
        /// Request timeout in seconds
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
        /// Maximum batch size for requests
        #[serde(default = "default_batch_size")]
        max_batch_size: usize,
    },
    /// Deterministic content-hash vectors, no model involved
    Hash {
        dimensions: usize,
    },
}

impl BackendConfig {
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Http { dimensions, .. } | Self::Hash { dimensions } => *dimensions,
        }
    }
}

/// Embedding provider configuration
///
/// ```toml
/// [embedding]
/// backend = "http"
/// endpoint = "https://api.openai.com/v1/embeddings"
/// model = "text-embedding-3-small"
/// dimensions = 1536
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend type: "http" or "hash"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// HTTP backend: API endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP backend: API key (optional, can also use OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP backend: model name for API requests
    #[serde(default)]
    pub model: Option<String>,
    /// Embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// HTTP backend: request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub max_batch_size: usize,
}

impl EmbeddingConfig {
    /// Resolve the backend configuration from flat fields.
    ///
    /// Returns `None` for an unknown backend name or an HTTP backend
    /// without an endpoint.
    pub fn resolve_backend(&self) -> Option<BackendConfig> {
        match self.backend.as_str() {
            "http" => {
                let endpoint = self.endpoint.clone()?;
                Some(BackendConfig::Http {
                    endpoint,
                    api_key: self.api_key.clone(),
                    model: self
                        .model
                        .clone()
                        .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                    dimensions: self.dimensions,
                    timeout_secs: self.timeout_secs,
                    max_batch_size: self.max_batch_size,
                })
            }
            "hash" => Some(BackendConfig::Hash {
                dimensions: self.dimensions,
            }),
            _ => None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            api_key: None,
            model: None,
            dimensions: default_dimensions(),
            timeout_secs: default_timeout(),
            max_batch_size: default_batch_size(),
        }
    }
}
