use tokio_tungstenite::tungstenite;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone, or our side of the connection was torn down.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Binding the listener or accepting a TCP stream failed.
    #[error("listener error: {0}")]
    Listen(#[source] std::io::Error),

    /// The WebSocket upgrade of an accepted stream failed.
    #[error("handshake with {peer} failed: {source}")]
    Handshake {
        /// Remote address of the stream.
        peer: std::net::SocketAddr,
        #[source]
        source: tungstenite::Error,
    },

    /// An accepted stream did not finish the WebSocket upgrade in time.
    #[error("handshake with {peer} timed out")]
    HandshakeTimeout {
        /// Remote address of the stream.
        peer: std::net::SocketAddr,
    },

    /// Dialing a remote server failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The address that was dialed.
        addr: String,
        #[source]
        source: tungstenite::Error,
    },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] tungstenite::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tungstenite::Error),
}
