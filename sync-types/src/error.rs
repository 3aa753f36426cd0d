//! Error types for linesync.

use thiserror::Error;

/// Errors that can occur while encoding or decoding linesync wire data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Envelope type does not carry the expected payload
    #[error("unexpected message type: {0}")]
    UnexpectedMessageType(String),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::UnexpectedMessageType("POLL".into());
        assert_eq!(err.to_string(), "unexpected message type: POLL");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
