//! Configuration management for linesync.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_client::{SyncConfig, DEFAULT_RELAY_ADDRESS};
use sync_types::ClientId;

const CONFIG_FILE: &str = "editor.json";

/// Document file used when `init` is not given one.
pub const DEFAULT_DOCUMENT_FILE: &str = "shared_document.txt";

/// Default time between reconciliation cycles.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Editor configuration stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Id stamped on outgoing envelopes.
    pub source_id: String,
    /// Relay address (`host:port`).
    pub relay_address: String,
    /// Path of the shared document file.
    pub document_path: PathBuf,
    /// Milliseconds between reconciliation cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl EditorConfig {
    /// Create a configuration with a fresh random source id.
    pub fn new(relay_address: &str, document_path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: ClientId::random().to_string(),
            relay_address: relay_address.to_string(),
            document_path: document_path.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Configuration used when `init` was never run.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(DEFAULT_RELAY_ADDRESS, data_dir.join(DEFAULT_DOCUMENT_FILE))
    }

    /// Load editor configuration from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Editor not initialized. Run 'linesync init' first.")?;
        serde_json::from_str(&contents).context("Invalid editor configuration")
    }

    /// Load the stored configuration, or defaults for `data_dir`.
    pub async fn load_or_default(data_dir: &Path) -> Result<Self> {
        if Self::exists(data_dir) {
            Self::load(data_dir).await
        } else {
            Ok(Self::in_data_dir(data_dir))
        }
    }

    /// Save editor configuration to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;
        let path = data_dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save editor configuration")?;
        Ok(())
    }

    /// Check if the editor is initialized.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(CONFIG_FILE).exists()
    }

    /// Path of the configuration file inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Time between reconciliation cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Client settings for this editor.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.relay_address)
            .with_source_id(ClientId::new(self.source_id.as_str()))
            .with_poll_interval(self.poll_interval())
    }
}
