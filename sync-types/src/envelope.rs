//! Envelope - the wire format wrapper for all linesync messages.
//!
//! Every message is one JSON object on its own line:
//!
//! ```text
//! {"source_id":"3f9a1c2e","type":"EDITOR_DIFF","timestamp":1705000000.25,"data":[...]}
//! ```
//!
//! The relay answers a `POLL` line with a single line holding a JSON array of
//! envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ClientId, DiffOp, SyncError};

/// Envelope type used for editor diffs unless configured otherwise.
pub const DEFAULT_DIFF_TYPE: &str = "EDITOR_DIFF";

const POLL: &str = "POLL";
const SYNC_ACK: &str = "SYNC_ACK";

/// Message type discriminator for envelope routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// Request to drain the sender's pending buffer
    Poll,
    /// Relay acknowledgement that a submitted message was fanned out
    SyncAck,
    /// Application message, relayed verbatim to other clients
    Data(String),
}

impl MessageType {
    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Poll => POLL,
            MessageType::SyncAck => SYNC_ACK,
            MessageType::Data(name) => name,
        }
    }
}

impl From<&str> for MessageType {
    fn from(value: &str) -> Self {
        match value {
            POLL => MessageType::Poll,
            SYNC_ACK => MessageType::SyncAck,
            other => MessageType::Data(other.to_string()),
        }
    }
}

/// The envelope wraps every protocol message with routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender's self-chosen id (informational; the relay routes by connection)
    #[serde(default = "unknown_source")]
    pub source_id: ClientId,
    /// Message type name
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Unix timestamp (seconds, fractional) - informational only
    #[serde(default)]
    pub timestamp: f64,
    /// Message payload
    #[serde(default)]
    pub data: Value,
}

fn unknown_source() -> ClientId {
    ClientId::new("unknown")
}

impl Envelope {
    /// Create a new envelope stamped with the current time.
    pub fn new(msg_type: impl Into<String>, source_id: ClientId, data: Value) -> Self {
        Self {
            source_id,
            msg_type: msg_type.into(),
            timestamp: now_secs(),
            data,
        }
    }

    /// Create a POLL request.
    pub fn poll(source_id: ClientId) -> Self {
        Self::new(POLL, source_id, Value::Null)
    }

    /// Create a SYNC_ACK notice.
    pub fn sync_ack(source_id: ClientId) -> Self {
        Self::new(SYNC_ACK, source_id, Value::Null)
    }

    /// Create an envelope carrying a diff batch.
    pub fn diff(
        msg_type: impl Into<String>,
        source_id: ClientId,
        ops: &[DiffOp],
    ) -> Result<Self, SyncError> {
        let data = serde_json::to_value(ops).map_err(SyncError::Serialization)?;
        Ok(Self::new(msg_type, source_id, data))
    }

    /// Get the message type as an enum.
    pub fn message_type(&self) -> MessageType {
        MessageType::from(self.msg_type.as_str())
    }

    /// Whether this is a POLL request.
    pub fn is_poll(&self) -> bool {
        self.msg_type == POLL
    }

    /// Decode the payload as a diff batch.
    pub fn diff_ops(&self) -> Result<Vec<DiffOp>, SyncError> {
        match self.message_type() {
            MessageType::Data(_) => {
                Vec::<DiffOp>::deserialize(&self.data).map_err(SyncError::Deserialization)
            }
            other => Err(SyncError::UnexpectedMessageType(other.as_str().to_string())),
        }
    }

    /// Serialize to a single newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String, SyncError> {
        let mut line = serde_json::to_string(self).map_err(SyncError::Serialization)?;
        line.push('\n');
        Ok(line)
    }

    /// Deserialize from one line of bytes (surrounding whitespace ignored).
    pub fn from_line(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes.trim_ascii()).map_err(SyncError::Deserialization)
    }

    /// Serialize a POLL response batch to a newline-terminated JSON array.
    pub fn batch_to_line(envelopes: &[Envelope]) -> Result<String, SyncError> {
        let mut line = serde_json::to_string(envelopes).map_err(SyncError::Serialization)?;
        line.push('\n');
        Ok(line)
    }

    /// Deserialize a POLL response batch.
    pub fn batch_from_line(bytes: &[u8]) -> Result<Vec<Envelope>, SyncError> {
        let trimmed = bytes.trim_ascii();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(trimmed).map_err(SyncError::Deserialization)
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ops() -> Vec<DiffOp> {
        vec![DiffOp::replace(2, 2, 2, vec!["X".to_string()])]
    }

    #[test]
    fn envelope_line_roundtrip() {
        let envelope = Envelope::diff(DEFAULT_DIFF_TYPE, ClientId::new("abcd1234"), &sample_ops())
            .unwrap();

        let line = envelope.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let restored = Envelope::from_line(line.as_bytes()).unwrap();
        assert_eq!(restored, envelope);
        assert_eq!(restored.diff_ops().unwrap(), sample_ops());
    }

    #[test]
    fn wire_uses_type_field() {
        let json = serde_json::to_value(Envelope::poll(ClientId::new("c1"))).unwrap();
        assert_eq!(json["type"], "POLL");
        assert_eq!(json["source_id"], "c1");
        assert!(json.get("msg_type").is_none());
    }

    #[test]
    fn bare_poll_request_decodes() {
        let envelope = Envelope::from_line(br#"{"type": "POLL", "source_id": "a1b2c3d4"}"#).unwrap();
        assert!(envelope.is_poll());
        assert_eq!(envelope.timestamp, 0.0);
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn message_type_classification() {
        assert_eq!(MessageType::from("POLL"), MessageType::Poll);
        assert_eq!(MessageType::from("SYNC_ACK"), MessageType::SyncAck);
        assert_eq!(
            MessageType::from("EDITOR_DIFF"),
            MessageType::Data("EDITOR_DIFF".into())
        );
        assert_eq!(MessageType::Data("X".into()).as_str(), "X");
    }

    #[test]
    fn control_messages_carry_no_diff() {
        let ack = Envelope::sync_ack(ClientId::new("relay"));
        assert!(matches!(
            ack.diff_ops(),
            Err(SyncError::UnexpectedMessageType(t)) if t == "SYNC_ACK"
        ));
    }

    #[test]
    fn malformed_diff_payload_fails_to_decode() {
        let envelope = Envelope::new(
            DEFAULT_DIFF_TYPE,
            ClientId::new("c1"),
            serde_json::json!({"not": "a list"}),
        );
        assert!(matches!(
            envelope.diff_ops(),
            Err(SyncError::Deserialization(_))
        ));
    }

    #[test]
    fn garbage_line_fails() {
        assert!(Envelope::from_line(b"{not json").is_err());
    }

    #[test]
    fn batch_roundtrip_preserves_order() {
        let batch = vec![
            Envelope::sync_ack(ClientId::new("relay")),
            Envelope::diff("EDITOR_DIFF", ClientId::new("p1"), &sample_ops()).unwrap(),
        ];
        let line = Envelope::batch_to_line(&batch).unwrap();
        let restored = Envelope::batch_from_line(line.as_bytes()).unwrap();
        assert_eq!(restored, batch);
    }

    #[test]
    fn empty_batch_line_decodes_to_nothing() {
        assert!(Envelope::batch_from_line(b"[]\n").unwrap().is_empty());
        assert!(Envelope::batch_from_line(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn envelope_new_sets_timestamp() {
        let envelope = Envelope::poll(ClientId::new("c1"));
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        assert!(envelope.timestamp <= now);
        assert!(envelope.timestamp >= now - 60.0);
    }
}
