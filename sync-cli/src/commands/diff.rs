//! Print the line diff between two files.

use anyhow::{Context, Result};
use std::path::Path;
use sync_core::{compute_diff, DocumentSnapshot};

/// Run the diff command.
pub async fn run(old: &Path, new: &Path) -> Result<()> {
    let old = read_document(old).await?;
    let new = read_document(new).await?;
    println!("{}", render(&old, &new)?);
    Ok(())
}

/// Read a file as a document snapshot.
pub async fn read_document(path: &Path) -> Result<DocumentSnapshot> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(DocumentSnapshot::from_text(&text))
}

/// The diff from `old` to `new` as pretty-printed JSON.
fn render(old: &DocumentSnapshot, new: &DocumentSnapshot) -> Result<String> {
    let ops = compute_diff(old, new);
    serde_json::to_string_pretty(&ops).context("Failed to encode diff")
}
