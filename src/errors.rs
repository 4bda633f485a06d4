// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the retrieval core and the request layer above it.

use std::fmt;
use thiserror::Error;

/// Stage of [`Retriever::prepare`](crate::retriever::Retriever::prepare) that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareStage {
    Chunking,
    Embedding,
    Indexing,
}

impl fmt::Display for PrepareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrepareStage::Chunking => "chunking",
            PrepareStage::Embedding => "embedding",
            PrepareStage::Indexing => "indexing",
        };
        f.write_str(name)
    }
}

/// Errors raised by the chunker, the ephemeral index and the retriever.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Search on an empty index")]
    EmptyIndex,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding contains a non-finite value at position {position}")]
    NonFiniteEmbedding { position: usize },

    #[error("Label text is empty; nothing to index")]
    NothingToIndex,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Retrieval preparation failed during {stage}: {source}")]
    Preparation {
        stage: PrepareStage,
        #[source]
        source: Box<RetrievalError>,
    },
}

impl RetrievalError {
    /// Wraps an error raised while preparing an index.
    pub fn preparation(stage: PrepareStage, source: RetrievalError) -> Self {
        RetrievalError::Preparation {
            stage,
            source: Box::new(source),
        }
    }

    /// Converts a provider failure, keeping its whole context chain.
    pub fn embedding(err: anyhow::Error) -> Self {
        RetrievalError::EmbeddingUnavailable(format!("{:#}", err))
    }

    /// Stage at which preparation failed, if this is a preparation error.
    pub fn stage(&self) -> Option<PrepareStage> {
        match self {
            RetrievalError::Preparation { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, unwrapping preparation layers.
    pub fn root_cause(&self) -> &RetrievalError {
        match self {
            RetrievalError::Preparation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors surfaced by [`Assistant`](crate::assistant::Assistant) for one request.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Label lookup failed: {0:#}")]
    Lookup(anyhow::Error),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Answer generation failed: {0:#}")]
    Generation(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preparation_error_reports_stage_and_cause() {
        let err = RetrievalError::preparation(
            PrepareStage::Embedding,
            RetrievalError::EmbeddingUnavailable("rate limited".to_string()),
        );
        assert_eq!(err.stage(), Some(PrepareStage::Embedding));
        let message = err.to_string();
        assert!(message.contains("during embedding"));
        assert!(message.contains("rate limited"));
        assert!(matches!(
            err.root_cause(),
            RetrievalError::EmbeddingUnavailable(_)
        ));
    }

    #[test]
    fn test_embedding_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("POST /embeddings");
        let wrapped = RetrievalError::embedding(err);
        let message = wrapped.to_string();
        assert!(message.contains("POST /embeddings"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_source_is_exposed() {
        use std::error::Error;
        let err = RetrievalError::preparation(PrepareStage::Indexing, RetrievalError::EmptyIndex);
        assert!(err.source().is_some());
        assert!(RetrievalError::EmptyIndex.source().is_none());
    }
}
