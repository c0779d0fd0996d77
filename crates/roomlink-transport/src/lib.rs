//! Transport layer for Roomlink.
//!
//! The packet protocol sits on a message-oriented carrier: each inbound
//! message is handed up as one contiguous [`Bytes`] buffer, and each
//! outbound buffer goes out as one message. [`Transport`] accepts
//! connections; [`Connection`] moves frames over one of them.
//!
//! The only carrier shipped is WebSocket, where one binary message holds
//! one frame.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{
    ClientWebSocketConnection, DEFAULT_HANDSHAKE_TIMEOUT, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

/// Process-unique identifier of one connection.
///
/// Servers also use it as the fallback display identity of a client
/// that never sent a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Hands out the next unused id. Never returns 0.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of incoming connections.
///
/// Futures are `Send` so the accept loop can live in a spawned task.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next connection that completed its handshake.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Stops handing out new connections. Open ones are unaffected.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// One open connection carrying whole frames.
///
/// `send` and `recv` are called from different tasks at the same time:
/// a writer draining an outbound queue and a reader feeding the
/// dispatcher. Neither may wait on the other.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes one frame as one message.
    fn send(&self, frame: Bytes) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Reads the next frame. `Ok(None)` means the peer closed cleanly.
    fn recv(&self) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send;

    /// Starts a clean close.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;

    /// Remote address, when the carrier knows it.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
