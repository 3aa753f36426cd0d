//! Write the editor configuration.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::{EditorConfig, DEFAULT_DOCUMENT_FILE};

/// Options for the init command.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Relay address.
    pub relay_address: String,
    /// Document file; defaults to one inside the data dir.
    pub document_path: Option<PathBuf>,
    /// Milliseconds between sync cycles.
    pub poll_interval_ms: u64,
    /// Overwrite an existing configuration.
    pub force: bool,
}

/// Run the init command.
pub async fn run(data_dir: &Path, options: InitOptions) -> Result<EditorConfig> {
    let existing = if EditorConfig::exists(data_dir) {
        if !options.force {
            anyhow::bail!(
                "Editor already initialized. Use --force or delete {} to reinitialize.",
                EditorConfig::path(data_dir).display()
            );
        }
        EditorConfig::load(data_dir).await.ok()
    } else {
        None
    };

    let document_path = options
        .document_path
        .unwrap_or_else(|| data_dir.join(DEFAULT_DOCUMENT_FILE));
    let mut config = EditorConfig::new(&options.relay_address, document_path);
    config.poll_interval_ms = options.poll_interval_ms;
    // Peers only ever see the source id, so keep it stable across re-inits.
    if let Some(existing) = existing {
        config.source_id = existing.source_id;
    }
    config.save(data_dir).await?;

    println!("Editor initialized successfully!");
    println!();
    println!("  Source ID: {}", config.source_id);
    println!("  Relay:     {}", config.relay_address);
    println!("  Document:  {}", config.document_path.display());
    println!("  Interval:  {}ms", config.poll_interval_ms);
    println!();
    println!("Next steps:");
    println!("  1. Start a relay: linesync-relay");
    println!("  2. Start editing: linesync edit");

    Ok(config)
}
