//! Earmark CLI - Audio Fingerprint Catalog Tool
//!
//! Features:
//! - Song ingestion (single file or whole directory)
//! - Clip identification from audio or a fingerprint document
//! - Fingerprint document export
//! - Catalog listing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// Earmark CLI - Landmark audio fingerprinting
#[derive(Parser)]
#[command(name = "earmark")]
#[command(version)]
#[command(about = "Identify songs from short audio clips", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Fingerprint catalog file
    #[arg(short, long, global = true, default_value = "fingerprints.json")]
    store: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the match threshold (0-1)
    #[arg(short, long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint a song and add it to the catalog
    Ingest {
        /// Catalog identity (song name)
        identity: String,

        /// Audio file
        path: PathBuf,
    },

    /// Add every audio file of a directory, named by file stem
    IngestDir {
        /// Directory of songs
        dir: PathBuf,

        /// File extension to pick up
        #[arg(short, long, default_value = "wav")]
        ext: String,
    },

    /// Write a fingerprint document for an audio file
    Fingerprint {
        /// Input audio file
        input: PathBuf,

        /// Output document
        #[arg(short, long, default_value = "query.json")]
        output: PathBuf,

        /// Song name recorded in the document
        #[arg(long)]
        song_name: Option<String>,
    },

    /// Identify a clip (audio file or .json fingerprint document)
    Match {
        /// Query input
        input: PathBuf,
    },

    /// List catalog identities
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
    earmark_core::init();

    let app = commands::App::new(cli.store, cli.config, cli.threshold, cli.format)?;

    match cli.command {
        Commands::Ingest { identity, path } => {
            app.ingest(&identity, &path).await?;
        }
        Commands::IngestDir { dir, ext } => {
            app.ingest_dir(&dir, &ext).await?;
        }
        Commands::Fingerprint { input, output, song_name } => {
            app.fingerprint(&input, &output, song_name).await?;
        }
        Commands::Match { input } => {
            app.identify(&input).await?;
        }
        Commands::List => {
            app.list().await?;
        }
    }

    Ok(())
}
