// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// medassist - Drug information grounded in the official label
///
/// Fetches the label for a drug, builds a throwaway semantic index over it and
/// answers questions using only the most relevant label passages.
#[derive(Parser, Debug)]
#[command(name = "medassist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Characters (or words) per label chunk
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Overlap between consecutive chunks
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Embedding provider (overrides config)
    #[arg(long, global = true, value_enum)]
    pub provider: Option<CliProvider>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliProvider {
    /// OpenAI-compatible embeddings API
    Openai,
    /// Local fastembed model
    Builtin,
    /// External embedding command
    Command,
    /// Deterministic offline hashing embedder
    Hash,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question about a drug from its label
    Ask {
        /// Drug name (brand or generic)
        #[arg(short, long)]
        drug: String,

        /// Question about the drug
        #[arg(short, long)]
        question: String,

        /// Number of label passages used as context
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Read the label from a local file instead of openFDA
        #[arg(long)]
        label_file: Option<PathBuf>,
    },

    /// Show the label passages that would ground an answer
    Context {
        /// Drug name (brand or generic)
        #[arg(short, long)]
        drug: String,

        /// Question about the drug
        #[arg(short, long)]
        question: String,

        /// Number of label passages to return
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Read the label from a local file instead of openFDA
        #[arg(long)]
        label_file: Option<PathBuf>,
    },

    /// Answer many questions, one `drug<TAB>question` per line
    Batch {
        /// Input file
        #[arg(short, long)]
        file: PathBuf,

        /// Number of label passages per question
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Only retrieve passages; do not call the answer generator
        #[arg(long)]
        context_only: bool,

        /// Read every label from a local file instead of openFDA
        #[arg(long)]
        label_file: Option<PathBuf>,
    },

    /// Split a label file into chunks and print them
    Chunk {
        /// Label text file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Build a medication reminder
    Remind {
        /// Medicine name
        #[arg(long)]
        medicine: String,

        /// Dose (e.g. 500mg)
        #[arg(long)]
        dose: String,

        /// Frequency (e.g. "3 times/day")
        #[arg(long)]
        frequency: String,

        /// Comma-separated times (e.g. 8am,2pm,8pm)
        #[arg(long)]
        times: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
