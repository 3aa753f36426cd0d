//! Apply a JSON line diff to a file.

use anyhow::{Context, Result};
use std::path::Path;
use sync_core::{apply_diffs, DocumentSnapshot};
use sync_types::DiffOp;

use super::diff::read_document;

/// Run the apply command.
pub async fn run(base: &Path, diff: &Path) -> Result<()> {
    let document = read_document(base).await?;
    let json = tokio::fs::read_to_string(diff)
        .await
        .with_context(|| format!("Failed to read {}", diff.display()))?;

    println!("{}", patch(&document, &json)?.to_text());
    Ok(())
}

/// Apply the JSON-encoded ops in `json` to `document`.
fn patch(document: &DocumentSnapshot, json: &str) -> Result<DocumentSnapshot> {
    let ops: Vec<DiffOp> = serde_json::from_str(json).context("Diff is not a JSON array of ops")?;
    apply_diffs(document, &ops).context("Diff does not apply to this document")
}
