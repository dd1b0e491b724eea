use std::path::PathBuf;

use clap::{Parser, Subcommand};
use domain_voice::DEFAULT_MATCH_THRESHOLD;

#[derive(Debug, Parser)]
#[command(name = "zerg-voice")]
#[command(about = "Store speaker embeddings and identify who is speaking")]
pub struct Cli {
    /// Use a throwaway in-process engine instead of Qdrant.
    /// Nothing persists between runs; see `demo` for a single-run walkthrough.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Collection name (overrides VOICE_COLLECTION)
    #[arg(short, long, global = true)]
    pub collection: Option<String>,

    /// Qdrant gRPC endpoint (overrides QDRANT_URL)
    #[arg(long, global = true)]
    pub qdrant_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add samples of one speaker, tagged with sample index and total
    Enroll {
        #[arg(short, long)]
        speaker: String,

        /// JSON embedding file
        #[arg(short, long)]
        file: PathBuf,

        /// Extra payload fields, repeatable (key=value)
        #[arg(short, long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },

    /// Upsert labelled embeddings in one batch
    Upsert {
        #[arg(short, long)]
        file: PathBuf,

        /// Label for files without per-entry speakers
        #[arg(short, long)]
        speaker: Option<String>,
    },

    /// Nearest stored embeddings to the first vector of a file
    Search {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: u64,

        /// Drop hits that do not reach this score
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Identify the speaker of the first vector of a file
    Identify {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f64,
    },

    /// List distinct speakers
    Speakers,

    /// Point count and per-speaker sample counts
    Stats,

    /// Batch upsert, search and list speakers in one run
    Demo {
        /// Labelled embedding file to load
        #[arg(short, long)]
        file: PathBuf,

        /// Embedding file whose first vector is the query
        #[arg(short, long)]
        query: PathBuf,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: u64,
    },

    /// Delete every embedding of one speaker
    Remove {
        #[arg(short, long)]
        speaker: String,
    },

    /// Delete all points, keep the collection
    Clear,

    /// Delete the collection
    Drop,

    /// Print the Qdrant web UI address
    Dashboard,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
