// SPDX-License-Identifier: MIT OR Apache-2.0

//! medassist - Drug label question answering library
//!
//! Request-scoped retrieval over a drug's label: chunk the label, embed the
//! chunks, rank them against a question and hand the best passages to an
//! answer generator. Shared modules for the medassist CLI tool.

pub mod assistant;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod generator;
pub mod index;
pub mod label;
pub mod output;
pub mod reminder;
pub mod retriever;

pub use errors::{AssistantError, PrepareStage, RetrievalError};
pub use index::{EphemeralIndex, ScoredChunk};
pub use retriever::{CancellationFlag, PreparedIndex, RetrievalSettings, Retriever};
