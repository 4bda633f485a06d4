// SPDX-License-Identifier: MIT OR Apache-2.0

//! medassist - Drug information grounded in the official label
//!
//! Looks up a drug's label, indexes it for the lifetime of one request and
//! answers questions from the most relevant passages only.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, CliProvider, Commands};
use commands::Runtime;
use medassist::config::{Config, EmbeddingProviderType};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Secrets such as OPENAI_API_KEY may live in a local .env file
    dotenv::dotenv().ok();

    // Initialize tracing with MEDASSIST_LOG env var (e.g., MEDASSIST_LOG=debug medassist ask ...)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MEDASSIST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(size) = cli.chunk_size {
        config.retrieval.chunk_size = Some(size);
    }
    if let Some(overlap) = cli.chunk_overlap {
        config.retrieval.chunk_overlap = Some(overlap);
    }
    if let Some(provider) = cli.provider {
        config.embeddings.provider = Some(match provider {
            CliProvider::Openai => EmbeddingProviderType::OpenAi,
            CliProvider::Builtin => EmbeddingProviderType::Builtin,
            CliProvider::Command => EmbeddingProviderType::Command,
            CliProvider::Hash => EmbeddingProviderType::Hash,
        });
    }

    let rt = Runtime {
        config,
        format: cli.format.unwrap_or_default(),
    };

    match cli.command {
        Commands::Ask {
            drug,
            question,
            k,
            label_file,
        } => {
            commands::ask(&rt, &drug, &question, k, label_file.as_deref())?;
        }
        Commands::Context {
            drug,
            question,
            k,
            label_file,
        } => {
            commands::context(&rt, &drug, &question, k, label_file.as_deref())?;
        }
        Commands::Batch {
            file,
            k,
            context_only,
            label_file,
        } => {
            commands::batch(&rt, &file, k, context_only, label_file.as_deref())?;
        }
        Commands::Chunk { file } => {
            commands::chunk(&rt, &file)?;
        }
        Commands::Remind {
            medicine,
            dose,
            frequency,
            times,
        } => {
            commands::remind(&rt, &medicine, &dose, &frequency, &times)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "medassist", &mut std::io::stdout());
        }
    }

    Ok(())
}
