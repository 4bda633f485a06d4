// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text chunker for label passages.
//!
//! This module splits a label document into overlapping passages suitable for
//! embedding generation. The window counts either characters or
//! whitespace-separated words, and consecutive windows share `overlap` units.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::{Result, RetrievalError};

/// Default window size (in units) per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap (in units) between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// Unit the chunk window is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// Whitespace-separated words.
    Words,
}

/// Configuration for the text chunker.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Number of units per chunk.
    pub size: usize,
    /// Number of overlapping units between consecutive chunks.
    pub overlap: usize,
    /// What a unit is.
    pub unit: ChunkUnit,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            unit: ChunkUnit::Chars,
        }
    }
}

impl ChunkConfig {
    /// Creates a new ChunkConfig with the specified parameters.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            size,
            overlap,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the window unit.
    pub fn with_unit(mut self, unit: ChunkUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Checks `size > overlap >= 0` and `size > 0`.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(RetrievalError::Configuration(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if self.overlap >= self.size {
            return Err(RetrievalError::Configuration(format!(
                "chunk overlap ({}) must be less than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }
}

/// A contiguous passage of the label with its position information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Sequence number of the chunk (0-indexed).
    pub index: usize,
    /// Byte offset of the chunk start in the label.
    pub start: usize,
    /// Character offset of the chunk start in the label.
    pub char_start: usize,
    /// The chunk text content.
    pub text: String,
}

/// Splits label text into overlapping chunks.
#[derive(Debug, Clone, Default)]
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// Creates a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Creates a chunker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Splits text into overlapping chunks.
    ///
    /// Algorithm:
    /// ```text
    /// step = size - overlap
    /// start = 0
    /// loop:
    ///   end = min(start + size, total_units)
    ///   emit units[start..end]
    ///   if end == total_units: stop
    ///   start += step
    /// ```
    ///
    /// The last chunk may be shorter than `size`. Text no longer than `size`
    /// yields exactly one chunk; empty text yields none.
    ///
    /// Stepping on until the window start passes the end of the text would
    /// only add trailing windows lying inside their predecessor's overlap, so
    /// the loop stops at the first window that reaches the end instead
    /// (`"0123456789"` at size 4, overlap 1 gives 3 chunks, not 4).
    pub fn chunk(&self, content: &str) -> Result<Vec<TextChunk>> {
        self.config.validate()?;
        if content.is_empty() {
            return Ok(Vec::new());
        }

        // Byte span of every unit, in order.
        let spans: Vec<(usize, usize)> = match self.config.unit {
            ChunkUnit::Chars => content
                .char_indices()
                .map(|(idx, ch)| (idx, idx + ch.len_utf8()))
                .collect(),
            ChunkUnit::Words => word_pattern()
                .find_iter(content)
                .map(|m| (m.start(), m.end()))
                .collect(),
        };

        let total_units = spans.len();
        if total_units == 0 {
            return Ok(Vec::new());
        }

        let step = self.config.step();
        let mut chunks = Vec::new();
        let mut start = 0_usize;

        loop {
            let end = (start + self.config.size).min(total_units);
            let byte_start = spans[start].0;
            let byte_end = spans[end - 1].1;

            chunks.push(TextChunk {
                index: chunks.len(),
                start: byte_start,
                char_start: match self.config.unit {
                    ChunkUnit::Chars => start,
                    ChunkUnit::Words => content[..byte_start].chars().count(),
                },
                text: content[byte_start..byte_end].to_string(),
            });

            if end == total_units {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

/// Chunks `text` into character windows of `size` with `overlap`.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    TextChunker::new(ChunkConfig::new(size, overlap)?).chunk(text)
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\S+").expect("valid word regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLET_LABEL: &str =
        "Take 1 tablet twice daily with food. Do not exceed 2 tablets in 24 hours.";

    fn reassemble(chunks: &[TextChunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.size, 800);
        assert_eq!(config.overlap, 120);
        assert_eq!(config.unit, ChunkUnit::Chars);
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(40, 10).is_ok());
        assert!(ChunkConfig::new(1, 0).is_ok());

        // overlap >= size
        assert!(ChunkConfig::new(20, 20).is_err());
        assert!(ChunkConfig::new(20, 30).is_err());

        // zero size
        let err = ChunkConfig::new(0, 0).unwrap_err();
        assert!(matches!(err, RetrievalError::Configuration(_)));
    }

    #[test]
    fn test_chunk_rejects_invalid_config_built_by_hand() {
        let chunker = TextChunker::new(ChunkConfig {
            size: 10,
            overlap: 10,
            unit: ChunkUnit::Chars,
        });
        assert!(matches!(
            chunker.chunk("anything"),
            Err(RetrievalError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_content() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk("").unwrap().is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk("hello world", 40, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].start, 0);

        let exact = chunk("0123456789", 10, 3).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].text, "0123456789");
    }

    #[test]
    fn test_tablet_label_windows() {
        let chunks = chunk(TABLET_LABEL, 40, 10).unwrap();

        // 73 chars, step 30: windows start at 0, 30, 60
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].start, 30);
        assert_eq!(chunks[2].start, 60);
        assert_eq!(chunks[0].text.chars().count(), 40);
        assert_eq!(chunks[2].text, " in 24 hours.");
        assert!(chunks[0].text.contains("twice daily with food"));
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_overlap_is_shared_between_neighbours() {
        let chunks = chunk(TABLET_LABEL, 40, 10).unwrap();
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(30).collect();
            let head: String = pair[1].text.chars().take(10).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_reassembly_reconstructs_text() {
        let samples = [
            TABLET_LABEL,
            "a",
            "abcdefghij",
            "abcdefghijk",
            "Dosage: 500 mg every 8 hours. Contraindications: hypersensitivity.",
        ];
        for text in samples {
            for (size, overlap) in [(1, 0), (3, 1), (5, 4), (10, 0), (16, 5), (40, 10)] {
                let chunks = chunk(text, size, overlap).unwrap();
                assert_eq!(
                    reassemble(&chunks, overlap),
                    text,
                    "size={} overlap={}",
                    size,
                    overlap
                );
            }
        }
    }

    #[test]
    fn test_no_chunk_is_contained_in_its_predecessor() {
        // 10 chars, size 4, overlap 1: windows [0,4) [3,7) [6,10) and then stop
        let chunks = chunk("0123456789", 4, 1).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text, "6789");
    }

    #[test]
    fn test_multibyte_characters() {
        let text = "ÄÖÜ äöü — naïve café";
        let chunks = chunk(text, 5, 2).unwrap();
        assert_eq!(reassemble(&chunks, 2), text);
        for c in &chunks {
            assert_eq!(&text[c.start..c.start + c.text.len()], c.text);
            assert_eq!(text[..c.start].chars().count(), c.char_start);
        }
    }

    #[test]
    fn test_word_unit_windows() {
        let chunker = TextChunker::new(ChunkConfig::new(4, 1).unwrap().with_unit(ChunkUnit::Words));
        let chunks = chunker.chunk("Take  one tablet\ntwice daily with food").unwrap();

        // 7 words, step 3: [0,4) [3,7)
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Take  one tablet\ntwice");
        assert_eq!(chunks[1].text, "twice daily with food");
        assert_eq!(chunks[1].start, 17);
        assert_eq!(chunks[1].char_start, 17);
    }

    #[test]
    fn test_word_unit_whitespace_only() {
        let chunker = TextChunker::new(ChunkConfig::new(4, 1).unwrap().with_unit(ChunkUnit::Words));
        assert!(chunker.chunk("  \n\t ").unwrap().is_empty());
    }

    #[test]
    fn test_deterministic() {
        let a = chunk(TABLET_LABEL, 16, 4).unwrap();
        let b = chunk(TABLET_LABEL, 16, 4).unwrap();
        assert_eq!(a, b);
    }
}
