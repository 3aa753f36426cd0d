//! Prometheus metrics endpoint.

use crate::server::RelayServer;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<RelayServer>>) -> impl IntoResponse {
    let m = relay.metrics();

    // Gauges — current state
    let clients = relay.client_count();
    let pending = relay.total_pending();
    let max_clients = relay.config().server.max_clients;

    // Counters — monotonic since startup
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let conns_rejected = m.connections_rejected.load(Ordering::Relaxed);
    let submitted = m.envelopes_submitted.load(Ordering::Relaxed);
    let fanned_out = m.envelopes_fanned_out.load(Ordering::Relaxed);
    let polls = m.polls_total.load(Ordering::Relaxed);
    let delivered = m.envelopes_delivered.load(Ordering::Relaxed);
    let dropped = m.envelopes_dropped.load(Ordering::Relaxed);
    let decode_errors = m.decode_errors.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP linesync_relay_clients_connected Number of connected clients
# TYPE linesync_relay_clients_connected gauge
linesync_relay_clients_connected {clients}

# HELP linesync_relay_clients_max Configured client limit
# TYPE linesync_relay_clients_max gauge
linesync_relay_clients_max {max_clients}

# HELP linesync_relay_envelopes_pending Envelopes waiting in client buffers
# TYPE linesync_relay_envelopes_pending gauge
linesync_relay_envelopes_pending {pending}

# HELP linesync_relay_info Server information
# TYPE linesync_relay_info gauge
linesync_relay_info{{version="{version}"}} 1

# HELP linesync_relay_connections_total Total connections accepted
# TYPE linesync_relay_connections_total counter
linesync_relay_connections_total {conns_total}

# HELP linesync_relay_connections_rejected_total Connections refused at the client limit
# TYPE linesync_relay_connections_rejected_total counter
linesync_relay_connections_rejected_total {conns_rejected}

# HELP linesync_relay_envelopes_submitted_total Envelopes submitted for fan-out
# TYPE linesync_relay_envelopes_submitted_total counter
linesync_relay_envelopes_submitted_total {submitted}

# HELP linesync_relay_envelopes_fanned_out_total Envelope copies queued for other clients
# TYPE linesync_relay_envelopes_fanned_out_total counter
linesync_relay_envelopes_fanned_out_total {fanned_out}

# HELP linesync_relay_polls_total POLL requests answered
# TYPE linesync_relay_polls_total counter
linesync_relay_polls_total {polls}

# HELP linesync_relay_envelopes_delivered_total Envelopes returned in POLL replies
# TYPE linesync_relay_envelopes_delivered_total counter
linesync_relay_envelopes_delivered_total {delivered}

# HELP linesync_relay_envelopes_dropped_total Undelivered envelopes discarded on disconnect
# TYPE linesync_relay_envelopes_dropped_total counter
linesync_relay_envelopes_dropped_total {dropped}

# HELP linesync_relay_decode_errors_total Lines discarded as undecodable
# TYPE linesync_relay_decode_errors_total counter
linesync_relay_decode_errors_total {decode_errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
