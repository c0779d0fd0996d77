//! WebSocket carrier built on `tokio-tungstenite`.
//!
//! Binary messages are frames. Text messages are not part of the wire
//! format and are dropped; ping/pong is left to tungstenite.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Transport, TransportError};

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Default limit on the WebSocket upgrade of one accepted stream.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts WebSocket upgrades on a TCP listener.
///
/// Upgrades run one at a time, each bounded by the handshake timeout, so a
/// peer that opens a socket and goes quiet holds up the next accept for at
/// most that long.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds to `addr` (`host:port`). Port `0` picks a free port; read it
    /// back with [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::Listen)?;
        tracing::info!(addr, "listening for WebSocket connections");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Replaces [`DEFAULT_HANDSHAKE_TIMEOUT`].
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Listen)?;

        let ws = tokio::time::timeout(
            self.handshake_timeout,
            tokio_tungstenite::accept_async(stream),
        )
        .await
        .map_err(|_| TransportError::HandshakeTimeout { peer })?
        .map_err(|source| TransportError::Handshake { peer, source })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted connection");
        Ok(WebSocketConnection::new(id, Some(peer), ws))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        // Dropping the transport closes the listener; nothing to flush.
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One WebSocket connection, server or client side.
///
/// The socket is split so the write half and the read half sit behind
/// separate locks: a reader parked in `recv` never holds up `send`.
pub struct WebSocketConnection<S = TcpStream> {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

/// What [`WebSocketConnection::connect`] returns.
pub type ClientWebSocketConnection = WebSocketConnection<MaybeTlsStream<TcpStream>>;

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(id: ConnectionId, peer: Option<SocketAddr>, ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

impl ClientWebSocketConnection {
    /// Dials `ws://{addr}`. `addr` is `host:port` without a scheme.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .map_err(|source| TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            })?;

        let peer = match ws.get_ref() {
            MaybeTlsStream::Plain(tcp) => tcp.peer_addr().ok(),
            _ => None,
        };
        let id = ConnectionId::next();
        tracing::debug!(%id, addr, "connected");
        Ok(Self::new(id, peer, ws))
    }
}

impl<S> Connection for WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Binary(frame))
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Bytes>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(message) = stream.next().await {
            match message.map_err(TransportError::ReceiveFailed)? {
                Message::Binary(frame) => return Ok(Some(frame)),
                Message::Close(_) => return Ok(None),
                Message::Text(text) => {
                    tracing::debug!(id = %self.id, len = text.as_str().len(), "dropping text message");
                }
                _ => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}
