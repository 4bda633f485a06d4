// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-scoped retrieval over one label document.
//!
//! [`Retriever::prepare`] chunks the label, embeds every chunk and builds an
//! [`EphemeralIndex`]; [`Retriever::answer_context`] embeds a question,
//! searches that index and joins the best chunks into the grounding context.
//! Nothing outlives the [`PreparedIndex`] the caller holds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::embedding::{ChunkConfig, EmbeddingProvider, TextChunk, TextChunker};
use crate::errors::{PrepareStage, Result, RetrievalError};
use crate::index::{EphemeralIndex, ScoredChunk};

/// Chunking and ranking settings for a [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub chunk: ChunkConfig,
    /// Chunks returned when the caller passes no `k`
    pub top_k: usize,
    /// Placed between chunks in the context string
    pub separator: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            top_k: crate::config::DEFAULT_TOP_K,
            separator: crate::config::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Shared flag that aborts in-flight retrieval work for one request.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a flag that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag for every clone.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Index over one label, owned by the request that prepared it.
#[derive(Debug)]
pub struct PreparedIndex {
    index: EphemeralIndex,
    label_digest: String,
    model_id: String,
}

impl PreparedIndex {
    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no chunks were indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Short blake3 digest of the label text, for logs.
    pub fn label_digest(&self) -> &str {
        &self.label_digest
    }

    /// Model that produced the chunk vectors.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Indexed chunks in label order.
    pub fn chunks(&self) -> &[TextChunk] {
        self.index.chunks()
    }
}

/// Builds per-request indexes and retrieves grounding context from them.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    settings: RetrievalSettings,
    cancel: Option<CancellationFlag>,
}

impl Retriever {
    /// Creates a retriever sharing `embedder`, with no cancellation flag.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, settings: RetrievalSettings) -> Self {
        Self {
            embedder,
            chunker: TextChunker::new(settings.chunk.clone()),
            settings,
            cancel: None,
        }
    }

    /// Checks `cancel` before every embedder call.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Settings this retriever chunks and ranks with.
    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Chunks, embeds and indexes `label_text`.
    ///
    /// Blank text fails with [`RetrievalError::NothingToIndex`] before any
    /// chunking or embedding. Every other failure is wrapped in
    /// [`RetrievalError::Preparation`] naming the stage that failed.
    pub fn prepare(&self, label_text: &str) -> Result<PreparedIndex> {
        if label_text.trim().is_empty() {
            return Err(RetrievalError::NothingToIndex);
        }

        let started = Instant::now();
        let label_digest = digest(label_text);

        let chunks = self
            .chunker
            .chunk(label_text)
            .map_err(|e| RetrievalError::preparation(PrepareStage::Chunking, e))?;

        let mut pairs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self
                .embed(&chunk.text)
                .map_err(|e| RetrievalError::preparation(PrepareStage::Embedding, e))?;
            pairs.push((chunk, vector));
        }

        let index = EphemeralIndex::build(pairs)
            .map_err(|e| RetrievalError::preparation(PrepareStage::Indexing, e))?;

        debug!(
            label = %label_digest,
            chunks = index.len(),
            dimension = index.dimension(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prepared label index"
        );

        Ok(PreparedIndex {
            index,
            label_digest,
            model_id: self.embedder.model_id().to_string(),
        })
    }

    /// Ranks the prepared chunks against `question`, best first.
    ///
    /// `k = None` uses the configured default; at most `prepared.len()`
    /// chunks come back. `k = 0` is a configuration error.
    pub fn retrieve(
        &self,
        prepared: &PreparedIndex,
        question: &str,
        k: Option<usize>,
    ) -> Result<Vec<ScoredChunk>> {
        let k = k.unwrap_or(self.settings.top_k);
        if k == 0 {
            return Err(RetrievalError::Configuration(
                "k must be greater than 0".to_string(),
            ));
        }
        let query = self.embed(question)?;
        let results = prepared.index.search(&query, k)?;
        debug!(
            label = %prepared.label_digest,
            k,
            returned = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved label chunks"
        );
        Ok(results)
    }

    /// Grounding context for `question`: the top `k` chunk texts in rank
    /// order, joined with the configured separator.
    pub fn answer_context(
        &self,
        prepared: &PreparedIndex,
        question: &str,
        k: Option<usize>,
    ) -> Result<String> {
        let results = self.retrieve(prepared, question, k)?;
        Ok(join_context(&results, &self.settings.separator))
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(RetrievalError::Cancelled);
        }
        self.embedder.embed_one(text).map_err(RetrievalError::embedding)
    }
}

/// Joins ranked chunk texts with `separator`.
pub fn join_context(results: &[ScoredChunk], separator: &str) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

fn digest(text: &str) -> String {
    let hex = blake3::hash(text.as_bytes()).to_hex();
    hex.as_str()[..16].to_string()
}
