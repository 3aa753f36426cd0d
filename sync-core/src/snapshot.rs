//! Immutable document snapshots.

use std::fmt;
use std::sync::Arc;

/// An immutable, ordered sequence of lines.
///
/// Cloning is cheap: clones share the same line storage. Every edit helper
/// returns a new snapshot and leaves `self` untouched.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DocumentSnapshot {
    lines: Arc<[String]>,
}

impl DocumentSnapshot {
    /// Create a snapshot from owned lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// An empty document.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Split text into lines.
    ///
    /// Recognises `\n` and `\r\n`. A trailing line terminator does not
    /// produce an extra empty line.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_string).collect())
    }

    /// Join the lines with `\n` (no trailing newline).
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// The lines of this snapshot.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get a line by 1-indexed line number.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Copy the lines out for editing.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.to_vec()
    }

    /// Replace line `number` (1-indexed). `None` if out of range.
    pub fn with_line_replaced(&self, number: usize, text: impl Into<String>) -> Option<Self> {
        let index = self.index_of(number)?;
        let mut lines = self.to_vec();
        lines[index] = text.into();
        Some(Self::new(lines))
    }

    /// Insert a line before line `number` (1-indexed); `len() + 1` appends.
    pub fn with_line_inserted(&self, number: usize, text: impl Into<String>) -> Option<Self> {
        if number == 0 || number > self.len() + 1 {
            return None;
        }
        let mut lines = self.to_vec();
        lines.insert(number - 1, text.into());
        Some(Self::new(lines))
    }

    /// Remove line `number` (1-indexed). `None` if out of range.
    pub fn with_line_removed(&self, number: usize) -> Option<Self> {
        let index = self.index_of(number)?;
        let mut lines = self.to_vec();
        lines.remove(index);
        Some(Self::new(lines))
    }

    fn index_of(&self, number: usize) -> Option<usize> {
        (1..=self.len()).contains(&number).then(|| number - 1)
    }
}

impl Default for DocumentSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<String>> for DocumentSnapshot {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl From<&[&str]> for DocumentSnapshot {
    fn from(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DocumentSnapshot {
    fn from(lines: [&str; N]) -> Self {
        Self::from(&lines[..])
    }
}

impl fmt::Debug for DocumentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lines.iter()).finish()
    }
}
