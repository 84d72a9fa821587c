//! Configuration for jurisearch

mod embedding;
mod index;
mod logging;
mod retrieval;

pub use embedding::{BackendConfig, EmbeddingConfig};
pub use index::{LexicalConfig, SimilarityMetric, StorageConfig, TokenizerKind, VectorConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use retrieval::{FusionConfig, RetrievalConfig, WeightingConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "jurisearch.toml";

/// Main configuration for the retrieval engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Corpus persistence
    #[serde(default)]
    pub storage: StorageConfig,
    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// BM25 index
    #[serde(default)]
    pub lexical: LexicalConfig,
    /// Vector index
    #[serde(default)]
    pub vector: VectorConfig,
    /// Rank fusion
    #[serde(default)]
    pub fusion: FusionConfig,
    /// Adaptive weighting policy
    #[serde(default)]
    pub weighting: WeightingConfig,
    /// Coordinator
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
        Ok(())
    }

    /// Validate all configuration fields.
    ///
    /// Collects every violation and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Embedding validation
        if self.embedding.dimensions == 0 {
            errors.push("embedding dimensions must be positive".to_string());
        }
        if self.embedding.dimensions > 4096 {
            errors.push("embedding dimensions must be <= 4096".to_string());
        }
        if self.embedding.max_batch_size == 0 {
            errors.push("embedding max_batch_size must be positive".to_string());
        }
        if self.embedding.resolve_backend().is_none() {
            errors.push(format!(
                "embedding backend '{}' is unknown or missing its endpoint",
                self.embedding.backend
            ));
        }

        // Lexical validation
        if !(self.lexical.k1 > 0.0) {
            errors.push("k1 must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.lexical.b) {
            errors.push("b must be between 0.0 and 1.0".to_string());
        }

        // Vector validation
        if !(self.vector.normalization_tolerance > 0.0 && self.vector.normalization_tolerance < 1.0) {
            errors.push("normalization_tolerance must be between 0.0 and 1.0 (exclusive)".to_string());
        }

        // Fusion validation
        if self.fusion.rrf_k == 0 {
            errors.push("rrf_k must be positive".to_string());
        }
        if !(self.fusion.weight_total > 0.0) {
            errors.push("weight_total must be positive".to_string());
        }

        // Weighting validation
        let min_share = self.weighting.min_share;
        if !(0.0..0.5).contains(&min_share) {
            errors.push("min_share must be in [0.0, 0.5)".to_string());
        } else {
            for (name, share) in self.weighting.shares() {
                if share < min_share || share > 1.0 - min_share {
                    errors.push(format!(
                        "{} must be between {} and {}, got {}",
                        name,
                        min_share,
                        1.0 - min_share,
                        share
                    ));
                }
            }
        }
        if self.weighting.short_query_tokens >= self.weighting.long_query_tokens {
            errors.push("short_query_tokens must be less than long_query_tokens".to_string());
        }

        // Retrieval validation
        if self.retrieval.candidate_count == 0 {
            errors.push("candidate_count must be positive".to_string());
        }
        if self.retrieval.default_top_k == 0 {
            errors.push("default_top_k must be positive".to_string());
        }
        if self.retrieval.timeout_ms == 0 {
            errors.push("timeout_ms must be positive".to_string());
        }
        if !self.retrieval.enable_lexical && !self.retrieval.enable_semantic {
            errors.push("at least one of enable_lexical and enable_semantic must be set".to_string());
        }

        // Storage validation
        if self.storage.persist && self.storage.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
