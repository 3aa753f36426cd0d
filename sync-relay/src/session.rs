//! Per-connection session handling.
//!
//! Each connection gets a Session that reads newline-delimited envelopes and
//! answers them in order:
//!
//! - `POLL` → one line holding the JSON array of everything pending
//! - anything else → fanned out to the other clients, no direct reply
//!
//! Lines that fail to decode are logged and skipped; the connection stays
//! open. EOF or an I/O error ends the session and deregisters the client.

use crate::error::{ProtocolError, ProtocolResult, RelayError};
use crate::server::RelayServer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use sync_types::{ClientId, Envelope};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Outcome of reading one line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// A complete line is in the buffer.
    Line,
    /// The line exceeded the limit and was skipped; holds its length.
    TooLong(usize),
    /// The peer closed the stream.
    Eof,
}

/// A per-connection session.
pub struct Session {
    relay: Arc<RelayServer>,
    client_id: ClientId,
    peer: String,
}

impl Session {
    /// Create a session for an already registered client.
    pub fn new(relay: Arc<RelayServer>, client_id: ClientId, peer: impl Into<String>) -> Self {
        Self {
            relay,
            client_id,
            peer: peer.into(),
        }
    }

    /// The relay-assigned id of this session's client.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Run the session until the peer disconnects, then deregister.
    pub async fn run<S>(self, stream: S) -> Result<(), RelayError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::info!(client = %self.client_id, peer = %self.peer, "client connected");

        let result = self.serve(stream).await;

        let dropped = self.relay.deregister(&self.client_id);
        tracing::info!(
            client = %self.client_id,
            dropped,
            remaining = self.relay.client_count(),
            "client disconnected"
        );
        result
    }

    async fn serve<S>(&self, stream: S) -> Result<(), RelayError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read, mut write) = tokio::io::split(stream);
        let mut reader = BufReader::new(read);
        let limit = self.relay.config().limits.max_line_bytes;
        let mut line = Vec::new();

        loop {
            match read_line(&mut reader, &mut line, limit).await? {
                LineRead::Eof => return Ok(()),
                LineRead::TooLong(len) => self.discard(ProtocolError::decode(format!(
                    "line of {len} bytes exceeds limit of {limit}"
                ))),
                LineRead::Line => {
                    if line.trim_ascii().is_empty() {
                        continue;
                    }
                    match self.handle_line(&line) {
                        Ok(Some(reply)) => write.write_all(reply.as_bytes()).await?,
                        Ok(None) => {}
                        Err(e) => self.discard(e),
                    }
                }
            }
        }
    }

    /// Handle one line, returning the reply to write, if any.
    fn handle_line(&self, line: &[u8]) -> ProtocolResult<Option<String>> {
        std::str::from_utf8(line).map_err(|_| ProtocolError::decode("line is not valid UTF-8"))?;
        let envelope =
            Envelope::from_line(line).map_err(|e| ProtocolError::decode(e.to_string()))?;

        if envelope.is_poll() {
            let pending = self.relay.drain(&self.client_id)?;
            let reply =
                Envelope::batch_to_line(&pending).map_err(|e| ProtocolError::Encode(e.to_string()))?;
            Ok(Some(reply))
        } else {
            self.relay.submit(&self.client_id, envelope)?;
            Ok(None)
        }
    }

    fn discard(&self, error: ProtocolError) {
        if matches!(error, ProtocolError::Decode { .. }) {
            self.relay
                .metrics()
                .decode_errors
                .fetch_add(1, Ordering::Relaxed);
        }
        tracing::warn!(client = %self.client_id, %error, "discarding line");
    }
}

/// Read one `\n`-terminated line of at most `limit` bytes into `buf`.
///
/// An overlong line is consumed in bounded chunks up to its newline and
/// reported as [`LineRead::TooLong`]. A final line without a newline counts
/// as a line.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let chunk = limit as u64 + 1;
    buf.clear();

    let n = (&mut *reader).take(chunk).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.ends_with(b"\n") || buf.len() <= limit {
        return Ok(LineRead::Line);
    }

    let mut skipped = buf.len();
    loop {
        buf.clear();
        let n = (&mut *reader).take(chunk).read_until(b'\n', buf).await?;
        skipped += n;
        if n == 0 || buf.ends_with(b"\n") {
            break;
        }
    }
    buf.clear();
    Ok(LineRead::TooLong(skipped))
}
