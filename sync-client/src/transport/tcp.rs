//! TcpTransport - newline-delimited JSON over a plain TCP stream.
//!
//! Each envelope is one JSON line. `send` writes the envelope and returns;
//! the relay does not answer it directly. `poll` writes a `POLL` line and
//! reads one reply line holding a JSON array of envelopes.
//!
//! A poll reply that misses the deadline is still owed by the relay. It is
//! counted and read first by the next poll, so replies never get out of step
//! with requests.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sync_types::{ClientId, Envelope};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default bounded wait for a poll reply.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Default bounded wait for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Active connection state.
struct ActiveConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Bytes of a reply line read before a timeout cut the read short.
    partial: Vec<u8>,
    /// Poll replies the relay still owes us.
    outstanding: usize,
}

/// TcpTransport implements the Transport trait over TCP.
///
/// # Example
///
/// ```ignore
/// let transport = TcpTransport::new(ClientId::random(), Duration::from_millis(100));
/// transport.connect("127.0.0.1:65432").await?;
/// transport.send(&envelope).await?;
/// let pending = transport.poll().await?;
/// ```
pub struct TcpTransport {
    source_id: ClientId,
    poll_timeout: Duration,
    connect_timeout: Duration,
    connection: Mutex<Option<ActiveConnection>>,
    connected: AtomicBool,
}

impl TcpTransport {
    /// Create a transport that stamps its POLL requests with `source_id`.
    pub fn new(source_id: ClientId, poll_timeout: Duration) -> Self {
        Self {
            source_id,
            poll_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connection: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn drop_connection(&self, guard: &mut Option<ActiveConnection>) {
        *guard = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Read one reply line, keeping partial bytes across timeouts.
///
/// `Ok(None)` means the deadline passed first.
async fn read_reply(
    conn: &mut ActiveConnection,
    deadline: tokio::time::Instant,
) -> Result<Option<Vec<u8>>, TransportError> {
    let read = tokio::time::timeout_at(deadline, conn.reader.read_until(b'\n', &mut conn.partial));
    match read.await {
        Err(_) => Ok(None),
        Ok(Ok(0)) => Err(TransportError::ConnectionClosed),
        Ok(Ok(_)) if !conn.partial.ends_with(b"\n") => Err(TransportError::ConnectionClosed),
        Ok(Ok(_)) => Ok(Some(std::mem::take(&mut conn.partial))),
        Ok(Err(e)) => Err(TransportError::ReceiveFailed(e.to_string())),
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut guard = self.connection.lock().await;
        self.drop_connection(&mut guard);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::ConnectionFailed(format!("timed out connecting to {address}")))?
            .map_err(|e| TransportError::ConnectionFailed(format!("{address}: {e}")))?;
        stream.set_nodelay(true).ok();

        let (read, write) = stream.into_split();
        *guard = Some(ActiveConnection {
            reader: BufReader::new(read),
            writer: write,
            partial: Vec::new(),
            outstanding: 0,
        });
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!(%address, "connected to relay");
        Ok(())
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let line = envelope
            .to_line()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let mut guard = self.connection.lock().await;
        let conn = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = conn.writer.write_all(line.as_bytes()).await {
            self.drop_connection(&mut guard);
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Envelope>, TransportError> {
        let request = Envelope::poll(self.source_id.clone())
            .to_line()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let mut guard = self.connection.lock().await;
        let conn = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = conn.writer.write_all(request.as_bytes()).await {
            self.drop_connection(&mut guard);
            return Err(TransportError::SendFailed(e.to_string()));
        }
        conn.outstanding += 1;

        let deadline = tokio::time::Instant::now() + self.poll_timeout;
        let mut received = Vec::new();

        while conn.outstanding > 0 {
            let line = match read_reply(conn, deadline).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!(outstanding = conn.outstanding, "poll reply timed out");
                    break;
                }
                Err(e) => {
                    self.drop_connection(&mut guard);
                    return Err(e);
                }
            };
            conn.outstanding -= 1;

            match Envelope::batch_from_line(&line) {
                Ok(batch) => received.extend(batch),
                // The reply is consumed either way; keep what was collected.
                Err(e) => tracing::warn!(error = %e, "discarding undecodable poll reply"),
            }
        }

        Ok(received)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_mut() {
            conn.writer.shutdown().await.ok();
        }
        self.drop_connection(&mut guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{DiffOp, DEFAULT_DIFF_TYPE};
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, address)
    }

    fn transport() -> TcpTransport {
        TcpTransport::new(ClientId::new("tester"), Duration::from_millis(200))
    }

    // ===========================================
    // Trait Compliance Tests
    // ===========================================

    #[test]
    fn tcp_transport_implements_transport_trait() {
        fn assert_transport<T: Transport>() {}
        assert_transport::<TcpTransport>();
    }

    // ===========================================
    // Connection State Tests
    // ===========================================

    #[tokio::test]
    async fn not_connected_initially() {
        assert!(!transport().is_connected());
    }

    #[tokio::test]
    async fn send_without_connect_fails() {
        let result = transport().send(&Envelope::poll(ClientId::new("x"))).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn poll_without_connect_fails() {
        let result = transport().poll().await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let (listener, address) = listener().await;
        drop(listener);

        let transport = transport();
        let result = transport.connect(&address).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn close_without_connect_succeeds() {
        assert!(transport().close().await.is_ok());
    }

    // ===========================================
    // Wire Behavior Tests
    // ===========================================

    #[tokio::test]
    async fn send_writes_one_json_line() {
        let (listener, address) = listener().await;
        let transport = transport();
        transport.connect(&address).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let ops = vec![DiffOp::replace(1, 1, 1, vec!["x".into()])];
        let envelope = Envelope::diff(DEFAULT_DIFF_TYPE, ClientId::new("tester"), &ops).unwrap();
        transport.send(&envelope).await.unwrap();

        let mut lines = BufReader::new(stream).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let received = Envelope::from_line(line.as_bytes()).unwrap();
        assert_eq!(received.diff_ops().unwrap(), ops);
    }

    #[tokio::test]
    async fn poll_reads_reply_batch() {
        let (listener, address) = listener().await;
        let transport = transport();
        transport.connect(&address).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let relay = tokio::spawn(async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert!(Envelope::from_line(line.as_bytes()).unwrap().is_poll());

            let reply = vec![Envelope::sync_ack(ClientId::new("relay"))];
            let reply = Envelope::batch_to_line(&reply).unwrap();
            write.write_all(reply.as_bytes()).await.unwrap();
        });

        let received = transport.poll().await.unwrap();
        relay.await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].msg_type, "SYNC_ACK");
    }

    #[tokio::test]
    async fn silent_relay_polls_empty_then_catches_up() {
        let (listener, address) = listener().await;
        let transport = transport();
        transport.connect(&address).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        // No reply within the deadline
        assert!(transport.poll().await.unwrap().is_empty());
        assert!(transport.is_connected());
        lines.next_line().await.unwrap().unwrap();

        // The late reply is picked up along with the next one
        let late = Envelope::batch_to_line(&[Envelope::sync_ack(ClientId::new("relay"))]).unwrap();
        write.write_all(late.as_bytes()).await.unwrap();
        write.write_all(b"[]\n").await.unwrap();

        let received = transport.poll().await.unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn bad_reply_line_keeps_other_batches() {
        let (listener, address) = listener().await;
        let transport = transport();
        transport.connect(&address).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        // Leave one reply outstanding so the next poll reads two lines
        assert!(transport.poll().await.unwrap().is_empty());
        lines.next_line().await.unwrap().unwrap();

        let good = Envelope::batch_to_line(&[Envelope::sync_ack(ClientId::new("relay"))]).unwrap();
        write.write_all(b"{not a batch\n").await.unwrap();
        write.write_all(good.as_bytes()).await.unwrap();

        let received = transport.poll().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].msg_type, "SYNC_ACK");
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn relay_hangup_disconnects() {
        let (listener, address) = listener().await;
        let transport = transport();
        transport.connect(&address).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);

        let result = transport.poll().await;
        assert!(result.is_err());
        assert!(!transport.is_connected());
    }
}
