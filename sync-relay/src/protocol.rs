//! TCP accept loop.
//!
//! Every accepted connection is assigned a `User-N` id, registered with the
//! relay and handed to its own [`Session`] task.

use crate::error::Result;
use crate::server::RelayServer;
use crate::session::Session;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Sessions already running are not interrupted by shutdown.
pub async fn serve<F>(relay: Arc<RelayServer>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!(
        address = %listener.local_addr()?,
        max_clients = relay.config().server.max_clients,
        "relay listening"
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(clients = relay.client_count(), "shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => accept(&relay, stream, peer),
                Err(e) => tracing::warn!("accept failed: {}", e),
            }
        }
    }
}

fn accept(relay: &Arc<RelayServer>, stream: TcpStream, peer: SocketAddr) {
    // Single accept task, so the check and the register cannot race.
    if relay.is_full() {
        tracing::warn!(
            "Client limit reached ({}/{}), rejecting {}",
            relay.client_count(),
            relay.config().server.max_clients,
            peer
        );
        relay
            .metrics()
            .connections_rejected
            .fetch_add(1, Ordering::Relaxed);
        drop(stream);
        return;
    }

    let client_id = relay.next_client_id();
    relay.register(&client_id);
    relay
        .metrics()
        .connections_total
        .fetch_add(1, Ordering::Relaxed);

    let session = Session::new(Arc::clone(relay), client_id, peer.to_string());
    // Spawn session handler - don't block the accept loop
    tokio::spawn(async move {
        if let Err(e) = session.run(stream).await {
            tracing::warn!("Session error: {}", e);
        }
    });
}
