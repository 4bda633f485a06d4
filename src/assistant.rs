// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handler: label lookup, retrieval and answer generation.
//!
//! Each call to [`Assistant::ask`] or [`Assistant::context`] is one request.
//! It fetches its own label and builds its own index; the only shared state
//! is the set of clients passed in at construction.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::errors::{AssistantError, RetrievalError};
use crate::generator::{AnswerGenerator, GroundedPrompt};
use crate::index::ScoredChunk;
use crate::label::LabelSource;
use crate::retriever::{join_context, CancellationFlag, RetrievalSettings, Retriever};

/// Result of a successful request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskOutcome {
    /// No label text on file for the drug.
    NotFound { drug: String },
    /// Answer grounded in the retrieved passages.
    Answered {
        drug: String,
        question: String,
        answer: String,
        passages: Vec<ScoredChunk>,
    },
}

/// Retrieved passages without a generated answer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContextOutcome {
    NotFound { drug: String },
    Retrieved {
        drug: String,
        question: String,
        chunk_count: usize,
        context: String,
        passages: Vec<ScoredChunk>,
    },
}

pub struct Assistant {
    labels: Arc<dyn LabelSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    settings: RetrievalSettings,
}

impl Assistant {
    pub fn new(
        labels: Arc<dyn LabelSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            labels,
            embedder,
            generator: None,
            settings,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Answers `question` about `drug` from its label.
    pub fn ask(
        &self,
        drug: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<AskOutcome, AssistantError> {
        self.ask_with_cancellation(drug, question, k, CancellationFlag::new())
    }

    /// Same as [`ask`](Self::ask), aborting embedding work once `cancel` is raised.
    pub fn ask_with_cancellation(
        &self,
        drug: &str,
        question: &str,
        k: Option<usize>,
        cancel: CancellationFlag,
    ) -> Result<AskOutcome, AssistantError> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            AssistantError::Generation(anyhow::anyhow!("no answer generator configured"))
        })?;

        let started = Instant::now();
        let passages = match self.retrieve(drug, question, k, cancel)? {
            Some(passages) => passages,
            None => {
                return Ok(AskOutcome::NotFound {
                    drug: drug.to_string(),
                })
            }
        };

        if passages.is_empty() {
            return Err(AssistantError::Generation(anyhow::anyhow!(
                "no label passages retrieved; refusing to answer without grounding"
            )));
        }

        let context = join_context(&passages, &self.settings.separator);
        let answer = generator
            .generate(&GroundedPrompt {
                context: &context,
                question,
            })
            .map_err(AssistantError::Generation)?;

        info!(
            drug,
            passages = passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );

        Ok(AskOutcome::Answered {
            drug: drug.to_string(),
            question: question.to_string(),
            answer,
            passages,
        })
    }

    /// Retrieves grounding context for `question` without generating an answer.
    pub fn context(
        &self,
        drug: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<ContextOutcome, AssistantError> {
        match self.retrieve(drug, question, k, CancellationFlag::new())? {
            Some(passages) => Ok(ContextOutcome::Retrieved {
                drug: drug.to_string(),
                question: question.to_string(),
                chunk_count: passages.len(),
                context: join_context(&passages, &self.settings.separator),
                passages,
            }),
            None => Ok(ContextOutcome::NotFound {
                drug: drug.to_string(),
            }),
        }
    }

    /// `Ok(None)` when the drug has no label text.
    fn retrieve(
        &self,
        drug: &str,
        question: &str,
        k: Option<usize>,
        cancel: CancellationFlag,
    ) -> Result<Option<Vec<ScoredChunk>>, AssistantError> {
        let label = self
            .labels
            .fetch_label(drug)
            .map_err(AssistantError::Lookup)?;
        let Some(label) = label.filter(|text| !text.trim().is_empty()) else {
            info!(drug, "no label found");
            return Ok(None);
        };

        let retriever = Retriever::new(self.embedder.clone(), self.settings.clone())
            .with_cancellation(cancel);
        let prepared = match retriever.prepare(&label) {
            Ok(prepared) => prepared,
            Err(RetrievalError::NothingToIndex) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let passages = retriever.retrieve(&prepared, question, k)?;
        Ok(Some(passages))
    }
}
