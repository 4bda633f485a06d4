// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - chunking and vector embeddings for label retrieval
//!
//! This module splits label text into passages and maps passages and
//! questions to vectors through a pluggable [`EmbeddingProvider`].

pub mod chunker;
pub mod openai;
pub mod provider;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{EmbeddingConfig, EmbeddingProviderType};

pub use chunker::{
    chunk, ChunkConfig, ChunkUnit, TextChunk, TextChunker, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
pub use openai::OpenAiEmbedder;
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use provider::{FastEmbedConfig, FastEmbedder};
pub use provider::{CommandProvider, EmbeddingProvider, HashEmbedder, DEFAULT_HASH_DIM};

/// Builds the configured provider once, for sharing across requests.
pub fn build_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider() {
        EmbeddingProviderType::OpenAi => {
            let api_key = api_key.context("OPENAI_API_KEY is not set")?;
            Arc::new(OpenAiEmbedder::new(
                api_key,
                config.base_url(),
                config.model(),
                config.dimensions,
                config.timeout(),
                config.max_retries(),
            )?)
        }
        #[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
        EmbeddingProviderType::Builtin => Arc::new(FastEmbedder::from_env()?),
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        EmbeddingProviderType::Builtin => {
            anyhow::bail!("The builtin embedding provider is not available on this platform")
        }
        EmbeddingProviderType::Command => Arc::new(CommandProvider::new(
            config.command().to_string(),
            config.model().to_string(),
        )),
        EmbeddingProviderType::Hash => {
            Arc::new(HashEmbedder::new(config.dimensions.unwrap_or(DEFAULT_HASH_DIM)))
        }
    };

    tracing::debug!(model = provider.model_id(), "embedding provider ready");
    Ok(provider)
}
