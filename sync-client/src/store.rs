//! Document persistence.
//!
//! The reconciliation loop saves the document whenever a cycle sends a local
//! edit or merges a remote one. [`FileStore`] keeps it as a plain text file,
//! one line per document line; [`MemoryStore`] is for tests and demos.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sync_core::DocumentSnapshot;
use thiserror::Error;

/// Contents of a freshly created document.
pub const WELCOME_TEXT: &str =
    "Welcome to the Collaborative OS Editor!\n\nStart typing here and press 'S' to sync.";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the document failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the document failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Loads and saves the shared document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load the document.
    async fn load(&self) -> Result<DocumentSnapshot, StoreError>;

    /// Replace the stored document with `snapshot`.
    async fn save(&self, snapshot: &DocumentSnapshot) -> Result<(), StoreError>;
}

/// A document kept in a text file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    /// Load the document, creating it with [`WELCOME_TEXT`] if it is missing.
    async fn load(&self) -> Result<DocumentSnapshot, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(DocumentSnapshot::from_text(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let snapshot = DocumentSnapshot::from_text(WELCOME_TEXT);
                self.save(&snapshot).await?;
                tracing::info!(path = %self.path.display(), "created new document");
                Ok(snapshot)
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn save(&self, snapshot: &DocumentSnapshot) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, snapshot.to_text())
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// An in-memory document.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    document: DocumentSnapshot,
    saves: usize,
}

impl MemoryStore {
    /// Create a store holding `document`.
    pub fn new(document: DocumentSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner { document, saves: 0 })),
        }
    }

    /// The stored document.
    pub fn document(&self) -> DocumentSnapshot {
        self.lock().document.clone()
    }

    /// Number of `save()` calls so far.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<DocumentSnapshot, StoreError> {
        Ok(self.document())
    }

    async fn save(&self, snapshot: &DocumentSnapshot) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.document = snapshot.clone();
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ===========================================
    // FileStore Tests
    // ===========================================

    #[tokio::test]
    async fn missing_file_is_created_with_welcome_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared_document.txt");
        let store = FileStore::new(&path);

        let doc = store.load().await.unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.line(1), Some("Welcome to the Collaborative OS Editor!"));
        assert_eq!(doc.line(2), Some(""));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), WELCOME_TEXT);
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("doc.txt"));
        let doc = DocumentSnapshot::from(["one", "", "three"]);

        store.save(&doc).await.unwrap();

        assert_eq!(store.load().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn existing_file_is_loaded_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let doc = FileStore::new(&path).load().await.unwrap();

        assert_eq!(doc, DocumentSnapshot::from(["a", "b"]));
    }

    #[tokio::test]
    async fn unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing-dir").join("doc.txt"));

        let result = store.save(&DocumentSnapshot::from(["x"])).await;
        assert!(matches!(result, Err(StoreError::Write { .. })));
    }

    // ===========================================
    // MemoryStore Tests
    // ===========================================

    #[tokio::test]
    async fn memory_store_shares_state_between_clones() {
        let store = MemoryStore::new(DocumentSnapshot::from(["a"]));
        let handle = store.clone();

        store.save(&DocumentSnapshot::from(["b"])).await.unwrap();

        assert_eq!(handle.document(), DocumentSnapshot::from(["b"]));
        assert_eq!(handle.save_count(), 1);
        assert_eq!(handle.load().await.unwrap(), DocumentSnapshot::from(["b"]));
    }
}
