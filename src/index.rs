// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-scoped vector index over label chunks.
//!
//! The index is an ordered array of `(chunk, vector)` pairs searched by
//! brute-force cosine similarity. A single label yields at most a few hundred
//! chunks, so an O(n·d) scan is all that is needed.

use serde::Serialize;

use crate::embedding::TextChunk;
use crate::errors::{Result, RetrievalError};

/// A chunk with its similarity to a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// Sequence number of the chunk in the label
    pub index: usize,
    /// Byte offset of the chunk in the label
    pub start: usize,
    /// Cosine similarity (-1.0 to 1.0)
    pub score: f32,
    /// Chunk text
    pub text: String,
}

/// Immutable in-memory index, built once per request.
#[derive(Debug, Clone, Default)]
pub struct EphemeralIndex {
    chunks: Vec<TextChunk>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl EphemeralIndex {
    /// Builds an index from `(chunk, vector)` pairs, keeping their order.
    ///
    /// All vectors must share one dimension and hold only finite values. Zero
    /// pairs yield an empty index whose [`search`](Self::search) fails with
    /// [`RetrievalError::EmptyIndex`].
    pub fn build<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TextChunk, Vec<f32>)>,
    {
        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut chunks = Vec::with_capacity(lower);
        let mut vectors = Vec::with_capacity(lower);
        let mut dimension = None;

        for (chunk, vector) in pairs {
            match dimension {
                None => dimension = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(RetrievalError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }
            check_finite(&vector)?;
            chunks.push(chunk);
            vectors.push(vector);
        }

        Ok(Self {
            chunks,
            vectors,
            dimension: dimension.unwrap_or(0),
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension shared by all entries (0 when empty).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Indexed chunks in label order.
    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Returns the `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep label order (lower chunk index first). `k` larger
    /// than the index returns every chunk.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if self.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        check_finite(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let chunk = &self.chunks[position];
                ScoredChunk {
                    index: chunk.index,
                    start: chunk.start,
                    score,
                    text: chunk.text.clone(),
                }
            })
            .collect())
    }
}

fn check_finite(vector: &[f32]) -> Result<()> {
    match vector.iter().position(|value| !value.is_finite()) {
        Some(position) => Err(RetrievalError::NonFiniteEmbedding { position }),
        None => Ok(()),
    }
}

/// Computes cosine similarity between two vectors.
///
/// Accumulates in f64 so large finite components cannot overflow. Mismatched
/// lengths, empty vectors, zero-norm vectors and non-finite input score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let magnitude_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let magnitude_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (magnitude_a * magnitude_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}
