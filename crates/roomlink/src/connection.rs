//! Per-connection task: pumps frames between one socket and the server.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register a session and spawn a writer task that drains its
//!      outbound queue into the socket
//!   2. Loop: receive a frame → hand it to the server synchronously
//!   3. On close or error, tear the session down exactly once
//!
//! Inbound frames of one connection are processed strictly in order;
//! frames of different connections run concurrently on their own tasks.

use std::sync::Arc;

use roomlink_transport::{Connection, ConnectionId};

use crate::{RoomlinkError, Server};

/// Drop guard that runs disconnect teardown when the handler exits.
///
/// This ensures cleanup happens even if the handler task is cancelled.
/// Teardown only touches synchronous locks, so it runs inline in `drop`.
struct SessionGuard {
    id: ConnectionId,
    server: Arc<Server>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.server.on_disconnected(self.id);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    server: Arc<Server>,
) -> Result<(), RoomlinkError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    // Register the session and arm the guard together: if registration
    // fails there is nothing to tear down.
    let (session, mut outbound) = server.on_connected(conn_id)?;
    let guard = SessionGuard {
        id: conn_id,
        server: Arc::clone(&server),
    };

    let writer = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = conn.send(frame).await {
                    tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
                    break;
                }
            }
        }
    });

    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                server.on_bytes_received(&session, &data);
            }
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    // Teardown first so the departing client's room is dealt with before
    // its queue stops accepting frames.
    drop(guard);
    drop(session);
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after disconnect");
    }
    Ok(())
}
