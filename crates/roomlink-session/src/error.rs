//! Error types for the session layer.

use roomlink_transport::ConnectionId;

/// Errors that can occur while tracking sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given connection.
    /// Happens when a disconnect is reported twice, or for a connection
    /// that was never registered.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// A session already exists for this connection.
    /// The transport reported the same accept twice.
    #[error("{0} already has a session")]
    AlreadyConnected(ConnectionId),
}
