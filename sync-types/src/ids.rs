//! Identity types for linesync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a client connected to the relay.
///
/// The relay assigns sequential ids (`User-1`, `User-2`, ...) on accept.
/// Clients stamp their own envelopes with a short random id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create the relay-assigned id for the `n`th accepted connection.
    pub fn sequential(n: u64) -> Self {
        Self(format!("User-{n}"))
    }

    /// Create a short random id (first 8 hex chars of a UUID v4).
    pub fn random() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
