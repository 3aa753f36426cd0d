//! # linesync
//!
//! Terminal line editor for linesync collaborative editing.
//!
//! ## Commands
//!
//! - `init`: Write the editor configuration
//! - `edit`: Edit the shared document, syncing through the relay
//! - `diff`: Print the line diff between two files as JSON
//! - `apply`: Apply a JSON line diff to a file
//!
//! ## Example
//!
//! ```bash
//! # Start a relay somewhere
//! linesync-relay
//!
//! # Configure and start editing
//! linesync init --relay 127.0.0.1:65432
//! linesync edit
//!
//! # Offline diff tooling
//! linesync diff old.txt new.txt > change.json
//! linesync apply old.txt change.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{apply, diff, edit, init};

/// Terminal line editor for linesync collaborative editing.
#[derive(Parser, Debug)]
#[command(name = "linesync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the editor configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the editor configuration
    Init {
        /// Relay address (host:port)
        #[arg(long, short, default_value = sync_client::DEFAULT_RELAY_ADDRESS)]
        relay: String,

        /// Shared document file (default: shared_document.txt in the data dir)
        #[arg(long, short)]
        document: Option<PathBuf>,

        /// Milliseconds between sync cycles
        #[arg(long, default_value_t = config::DEFAULT_POLL_INTERVAL_MS)]
        poll_interval_ms: u64,

        /// Overwrite an existing configuration (keeps the source id)
        #[arg(long)]
        force: bool,
    },

    /// Edit the shared document
    Edit {
        /// Override the configured relay address
        #[arg(long, short)]
        relay: Option<String>,

        /// Override the configured document file
        #[arg(long, short)]
        document: Option<PathBuf>,
    },

    /// Print the line diff between two files as JSON
    Diff {
        /// Original file
        old: PathBuf,
        /// Edited file
        new: PathBuf,
    },

    /// Apply a JSON line diff to a file and print the result
    Apply {
        /// File the diff was computed against
        base: PathBuf,
        /// JSON array of diff operations
        diff: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with document output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("warn"))
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            relay,
            document,
            poll_interval_ms,
            force,
        } => {
            let data_dir = resolve_data_dir(cli.data_dir)?;
            let options = init::InitOptions {
                relay_address: relay,
                document_path: document,
                poll_interval_ms,
                force,
            };
            init::run(&data_dir, options).await?;
        }
        Commands::Edit { relay, document } => {
            let data_dir = resolve_data_dir(cli.data_dir)?;
            let mut config = config::EditorConfig::load_or_default(&data_dir).await?;
            if let Some(relay) = relay {
                config.relay_address = relay;
            }
            if let Some(document) = document {
                config.document_path = document;
            }
            edit::run(&config).await?;
        }
        Commands::Diff { old, new } => {
            diff::run(&old, &new).await?;
        }
        Commands::Apply { base, diff } => {
            apply::run(&base, &diff).await?;
        }
    }

    Ok(())
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => default_data_dir(),
    }
}

/// Get the default data directory for linesync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "linesync", "linesync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
