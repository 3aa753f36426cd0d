//! Error types for linesync-relay.

use sync_types::ClientId;

/// Main error type for linesync-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol layer errors.
///
/// None of these end a connection; the offending line is discarded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A line could not be decoded into an envelope.
    #[error("undecodable line: {reason}")]
    Decode {
        /// Why decoding failed.
        reason: String,
    },

    /// A POLL was submitted for fan-out.
    #[error("POLL cannot be submitted for fan-out")]
    PollSubmitted,

    /// The client has no registered buffer.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    /// A reply could not be encoded.
    #[error("failed to encode reply: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// Build a decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
