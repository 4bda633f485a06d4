// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for medassist
//!
//! Loads configuration from .medassistrc.toml in current directory or
//! ~/.config/medassist/config.toml. Secrets (API keys) are read from the
//! environment, never from these files.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embedding::{ChunkConfig, ChunkUnit, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::errors::{Result, RetrievalError};
use crate::retriever::RetrievalSettings;

/// Default number of chunks handed to the generator.
pub const DEFAULT_TOP_K: usize = 4;

/// Default separator placed between retrieved chunks.
pub const DEFAULT_SEPARATOR: &str = "\n\n---\n\n";

/// Default OpenAI-compatible API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default openFDA drug label endpoint.
pub const DEFAULT_LABEL_URL: &str = "https://api.fda.gov/drug/label.json";

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAi,
    /// Local fastembed model
    Builtin,
    /// External command speaking JSON over stdin/stdout
    Command,
    /// Deterministic feature-hashing embedder (offline)
    Hash,
}

/// Retrieval configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Window size per chunk, in `unit`s
    pub chunk_size: Option<usize>,
    /// Overlap between consecutive chunks, in `unit`s
    pub chunk_overlap: Option<usize>,
    /// Window unit (chars or words)
    pub unit: Option<ChunkUnit>,
    /// Number of chunks returned per question
    pub top_k: Option<usize>,
    /// Separator between chunks in the context string
    pub separator: Option<String>,
}

impl RetrievalConfig {
    /// Get chunk size (defaults to 800)
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Get chunk overlap (defaults to 120)
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP)
    }

    /// Get chunk unit (defaults to chars)
    pub fn unit(&self) -> ChunkUnit {
        self.unit.unwrap_or_default()
    }

    /// Get top k (defaults to 4)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    /// Get separator (defaults to a horizontal rule between blank lines)
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    /// Validated chunker configuration
    pub fn chunk_config(&self) -> Result<ChunkConfig> {
        Ok(ChunkConfig::new(self.chunk_size(), self.chunk_overlap())?.with_unit(self.unit()))
    }

    /// Settings for a [`Retriever`](crate::retriever::Retriever)
    pub fn settings(&self) -> Result<RetrievalSettings> {
        if self.top_k() == 0 {
            return Err(RetrievalError::Configuration(
                "top_k must be greater than 0".to_string(),
            ));
        }
        Ok(RetrievalSettings {
            chunk: self.chunk_config()?,
            top_k: self.top_k(),
            separator: self.separator().to_string(),
        })
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (openai, builtin, command, hash)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// API root for the openai provider
    pub base_url: Option<String>,
    /// Requested output dimensions (openai) or vector size (hash)
    pub dimensions: Option<usize>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Retries on 429/5xx responses
    pub max_retries: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to OpenAi)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "text-embedding-3-small")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("text-embedding-3-small")
    }

    /// Get API root
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get timeout (defaults to 30s)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }

    /// Get max retries (defaults to 2)
    pub fn max_retries(&self) -> usize {
        self.max_retries.unwrap_or(2)
    }
}

/// Answer generator configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Chat model
    pub model: Option<String>,
    /// API root
    pub base_url: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<usize>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl GeneratorConfig {
    /// Get model (defaults to "gpt-4o-mini")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("gpt-4o-mini")
    }

    /// Get API root
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    /// Get temperature (defaults to 0.0)
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.0)
    }

    /// Get max tokens (defaults to 700)
    pub fn max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(700)
    }

    /// Get timeout (defaults to 60s)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(60))
    }
}

/// Label lookup configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Label endpoint
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Label fields to concatenate, in order
    pub sections: Option<Vec<String>>,
}

impl LabelConfig {
    /// Get label endpoint (defaults to openFDA)
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_LABEL_URL)
    }

    /// Get timeout (defaults to 15s)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(15))
    }

    /// Get the label sections to index
    pub fn sections(&self) -> Vec<String> {
        self.sections.clone().unwrap_or_else(|| {
            crate::label::DEFAULT_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }
}

/// Configuration loaded from .medassistrc.toml or ~/.config/medassist/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Generator configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Label lookup configuration
    #[serde(default)]
    pub label: LabelConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .medassistrc.toml in current directory
    /// 2. ~/.config/medassist/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(&PathBuf::from(".medassistrc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("medassist").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::from_toml_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded configuration");
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the retrieval configuration
    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the generator configuration
    pub fn generator(&self) -> &GeneratorConfig {
        &self.generator
    }

    /// Get the label configuration
    pub fn label(&self) -> &LabelConfig {
        &self.label
    }
}
