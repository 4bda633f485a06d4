// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.
//!
//! Clients are built once here from configuration and shared by `Arc` with
//! every request the command runs.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use medassist::assistant::{AskOutcome, Assistant, ContextOutcome};
use medassist::config::Config;
use medassist::embedding::{build_provider, TextChunk, TextChunker};
use medassist::errors::{AssistantError, RetrievalError};
use medassist::generator::{AnswerGenerator, OpenAiChatGenerator};
use medassist::index::ScoredChunk;
use medassist::label::{FileLabelSource, LabelSource, OpenFdaLabelSource};
use medassist::output::{
    colorize_drug, colorize_heading, colorize_passage, colorize_score, colorize_warning,
    use_colors,
};
use medassist::reminder::Reminder;

use crate::cli::OutputFormat;

const NOT_FOUND_MESSAGE: &str = "No drug information found";
const GENERIC_ERROR_MESSAGE: &str = "Error processing drug info";

/// Process-wide settings for one CLI invocation.
pub struct Runtime {
    pub config: Config,
    pub format: OutputFormat,
}

impl Runtime {
    fn api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    fn assistant(&self, label_file: Option<&Path>, with_generator: bool) -> Result<Assistant> {
        let api_key = Self::api_key();
        let settings = self
            .config
            .retrieval()
            .settings()
            .context("Invalid retrieval configuration")?;
        let embedder = build_provider(self.config.embeddings(), api_key.as_deref())?;

        let labels: Arc<dyn LabelSource> = match label_file {
            Some(path) => Arc::new(FileLabelSource::new(path)),
            None => {
                let label = self.config.label();
                Arc::new(OpenFdaLabelSource::new(
                    label.base_url(),
                    label.timeout(),
                    label.sections(),
                )?)
            }
        };

        let mut assistant = Assistant::new(labels, embedder, settings);
        if with_generator {
            let api_key = api_key.context("OPENAI_API_KEY is not set")?;
            let settings = self.config.generator();
            let generator: Arc<dyn AnswerGenerator> = Arc::new(OpenAiChatGenerator::new(
                &api_key,
                settings.base_url(),
                settings.model(),
                settings.temperature(),
                settings.max_tokens(),
                settings.timeout(),
            )?);
            assistant = assistant.with_generator(generator);
        }
        Ok(assistant)
    }
}

/// User-facing message for a failed request.
pub fn user_message(err: &AssistantError) -> &'static str {
    match err {
        AssistantError::Lookup(_) => "Drug label service is temporarily unavailable",
        AssistantError::Retrieval(inner) => match inner.root_cause() {
            RetrievalError::EmbeddingUnavailable(_) => {
                "Embedding service is temporarily unavailable"
            }
            _ => GENERIC_ERROR_MESSAGE,
        },
        AssistantError::Generation(_) => GENERIC_ERROR_MESSAGE,
    }
}

fn fail(err: AssistantError) -> anyhow::Error {
    tracing::error!(error = %err, "request failed");
    let message = user_message(&err);
    anyhow::Error::new(err).context(message)
}

pub fn ask(
    rt: &Runtime,
    drug: &str,
    question: &str,
    k: Option<usize>,
    label_file: Option<&Path>,
) -> Result<()> {
    let assistant = rt.assistant(label_file, true)?;
    let outcome = assistant.ask(drug, question, k).map_err(fail)?;

    match rt.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_ask(&outcome, use_colors()),
    }
    Ok(())
}

pub fn context(
    rt: &Runtime,
    drug: &str,
    question: &str,
    k: Option<usize>,
    label_file: Option<&Path>,
) -> Result<()> {
    let assistant = rt.assistant(label_file, false)?;
    let outcome = assistant.context(drug, question, k).map_err(fail)?;

    match rt.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_context(&outcome, use_colors()),
    }
    Ok(())
}

/// One line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchEntry {
    drug: String,
    question: String,
}

fn parse_batch(content: &str) -> Result<Vec<BatchEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            let (drug, question) = line
                .split_once('\t')
                .with_context(|| format!("line {}: expected `drug<TAB>question`", number + 1))?;
            let (drug, question) = (drug.trim(), question.trim());
            anyhow::ensure!(
                !drug.is_empty() && !question.is_empty(),
                "line {}: drug and question must not be empty",
                number + 1
            );
            Ok(BatchEntry {
                drug: drug.to_string(),
                question: question.to_string(),
            })
        })
        .collect()
}

pub fn batch(
    rt: &Runtime,
    file: &Path,
    k: Option<usize>,
    context_only: bool,
    label_file: Option<&Path>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file: {}", file.display()))?;
    let entries = parse_batch(&content)?;
    let assistant = rt.assistant(label_file, !context_only)?;

    // Each entry is an independent request with its own label and index.
    let results: Vec<serde_json::Value> = entries
        .par_iter()
        .map(|entry| {
            let outcome = if context_only {
                assistant
                    .context(&entry.drug, &entry.question, k)
                    .map(serde_json::to_value)
            } else {
                assistant
                    .ask(&entry.drug, &entry.question, k)
                    .map(serde_json::to_value)
            };
            match outcome {
                Ok(Ok(value)) => value,
                Ok(Err(err)) => error_value(entry, GENERIC_ERROR_MESSAGE, &err.to_string()),
                Err(err) => {
                    tracing::error!(drug = %entry.drug, error = %err, "request failed");
                    error_value(entry, user_message(&err), &err.to_string())
                }
            }
        })
        .collect();

    match rt.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            let color = use_colors();
            for (entry, value) in entries.iter().zip(&results) {
                println!(
                    "{} {}",
                    colorize_drug(&entry.drug, color),
                    colorize_heading(&entry.question, color)
                );
                print_batch_value(value, color);
                println!();
            }
        }
    }
    Ok(())
}

fn error_value(entry: &BatchEntry, message: &str, detail: &str) -> serde_json::Value {
    json!({
        "status": "error",
        "drug": entry.drug,
        "question": entry.question,
        "message": message,
        "detail": detail,
    })
}

fn print_batch_value(value: &serde_json::Value, color: bool) {
    let text = |key: &str| value[key].as_str().unwrap_or_default().to_string();
    match value["status"].as_str() {
        Some("answered") => println!("{}", text("answer")),
        Some("retrieved") => println!("{}", colorize_passage(&text("context"), color)),
        Some("not_found") => println!("{}", colorize_warning(NOT_FOUND_MESSAGE, color)),
        _ => println!("{}", colorize_warning(&text("message"), color)),
    }
}

pub fn chunk(rt: &Runtime, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read label file: {}", file.display()))?;
    let chunker = TextChunker::new(rt.config.retrieval().chunk_config()?);
    let chunks: Vec<TextChunk> = chunker.chunk(&content)?;

    match rt.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chunks)?),
        OutputFormat::Text => {
            let color = use_colors();
            for chunk in &chunks {
                println!(
                    "{}",
                    colorize_heading(
                        &format!(
                            "#{} @{} ({} chars)",
                            chunk.index,
                            chunk.char_start,
                            chunk.text.chars().count()
                        ),
                        color
                    )
                );
                println!("{}", chunk.text);
            }
        }
    }
    Ok(())
}

pub fn remind(
    rt: &Runtime,
    medicine: &str,
    dose: &str,
    frequency: &str,
    times: &str,
) -> Result<()> {
    let reminder = Reminder::new(medicine, dose, frequency, times)?;

    match rt.format {
        OutputFormat::Json => println!("{}", reminder.to_json()?),
        OutputFormat::Text => {
            let color = use_colors();
            println!("{}", colorize_heading("Medication reminder set", color));
            println!("Medicine:  {}", colorize_drug(&reminder.medicine, color));
            println!("Dose:      {}", reminder.dose);
            println!("Frequency: {}", reminder.frequency);
            let schedule: Vec<String> = reminder
                .reminder_times
                .iter()
                .zip(&reminder.schedule)
                .map(|(raw, time)| format!("{} ({})", raw, time.display_24h()))
                .collect();
            println!("Times:     {}", schedule.join(", "));
        }
    }
    Ok(())
}

fn print_ask(outcome: &AskOutcome, color: bool) {
    match outcome {
        AskOutcome::NotFound { drug } => {
            println!(
                "{} for {}",
                colorize_warning(NOT_FOUND_MESSAGE, color),
                colorize_drug(drug, color)
            );
        }
        AskOutcome::Answered { drug, answer, .. } => {
            println!(
                "{} {}",
                colorize_heading("Drug information:", color),
                colorize_drug(drug, color)
            );
            println!();
            println!("{}", answer);
        }
    }
}

fn print_context(outcome: &ContextOutcome, color: bool) {
    match outcome {
        ContextOutcome::NotFound { drug } => {
            println!(
                "{} for {}",
                colorize_warning(NOT_FOUND_MESSAGE, color),
                colorize_drug(drug, color)
            );
        }
        ContextOutcome::Retrieved { passages, .. } => {
            for passage in passages {
                print_passage(passage, color);
            }
        }
    }
}

fn print_passage(passage: &ScoredChunk, color: bool) {
    println!(
        "{} score={}",
        colorize_heading(&format!("#{} @{}", passage.index, passage.start), color),
        colorize_score(passage.score, color)
    );
    println!("{}", colorize_passage(&passage.text, color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let entries = parse_batch(
            "# drug\tquestion\nibuprofen\tHow often?\n\n  aspirin \t Max dose? \n",
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![
                BatchEntry {
                    drug: "ibuprofen".to_string(),
                    question: "How often?".to_string()
                },
                BatchEntry {
                    drug: "aspirin".to_string(),
                    question: "Max dose?".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_batch_reports_line() {
        let err = parse_batch("ibuprofen\tok\nno tab here\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_batch("\t question\n").is_err());
    }

    #[test]
    fn test_user_messages() {
        let lookup = AssistantError::Lookup(anyhow::anyhow!("timeout"));
        assert_eq!(
            user_message(&lookup),
            "Drug label service is temporarily unavailable"
        );

        let embedding = AssistantError::Retrieval(RetrievalError::preparation(
            medassist::PrepareStage::Embedding,
            RetrievalError::EmbeddingUnavailable("429".to_string()),
        ));
        assert_eq!(
            user_message(&embedding),
            "Embedding service is temporarily unavailable"
        );

        let other = AssistantError::Retrieval(RetrievalError::EmptyIndex);
        assert_eq!(user_message(&other), GENERIC_ERROR_MESSAGE);
    }
}
