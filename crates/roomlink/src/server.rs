//! The room server: shared state, the operations packet handlers call,
//! and the builder/accept loop that puts it on the network.
//!
//! [`Server`] is transport-agnostic. It is driven by three notifications
//! (`on_connected`, `on_bytes_received`, `on_disconnected`) so tests can
//! exercise it without sockets. [`RoomlinkServer`] wires it to a
//! WebSocket listener.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use roomlink_protocol::{
    Dispatcher, PacketRegistry, PacketSink, Receipt, RoomCode, receive,
};
use roomlink_room::{Departure, RoomError, RoomTable};
use roomlink_session::{Session, SessionError, SessionManager};
use roomlink_transport::{
    Connection, ConnectionId, Transport, WebSocketTransport,
};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::connection::handle_connection;
use crate::handlers::server_dispatcher;
use crate::RoomlinkError;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Shared server state passed to every connection task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry and dispatcher are read-only after construction; sessions and
/// rooms use short-lived locks.
pub struct Server {
    registry: Arc<PacketRegistry>,
    sessions: Mutex<SessionManager>,
    rooms: RoomTable,
    dispatcher: Dispatcher<Server, Arc<Session>>,
}

impl Server {
    /// Creates a server that speaks the packets in `registry`.
    pub fn new(registry: Arc<PacketRegistry>) -> Self {
        Self {
            registry,
            sessions: Mutex::new(SessionManager::new()),
            rooms: RoomTable::new(),
            dispatcher: server_dispatcher(),
        }
    }

    /// Creates a server with the full packet catalog registered.
    pub fn with_catalog() -> Self {
        Self::new(Arc::new(PacketRegistry::with_catalog()))
    }

    /// The registry shared with every session.
    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.registry
    }

    /// The live room table.
    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    /// Looks up a live session.
    pub fn session(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.lock().get(id)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    // -- Connection lifecycle ------------------------------------------------

    /// Registers a newly accepted connection.
    ///
    /// Returns the session and the receiving end of its outbound queue;
    /// whoever owns the socket drains the receiver.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if `id` is already live.
    pub fn on_connected(
        &self,
        id: ConnectionId,
    ) -> Result<(Arc<Session>, mpsc::UnboundedReceiver<Bytes>), SessionError> {
        let (session, outbound) = Session::channel(id, Arc::clone(&self.registry));
        let session = self.sessions.lock().connect(Arc::new(session))?;
        Ok((session, outbound))
    }

    /// Decodes one inbound frame from `session` and runs its handler.
    ///
    /// Never fails: malformed frames, unknown ids, and handler faults are
    /// logged and the connection carries on.
    pub fn on_bytes_received(&self, session: &Arc<Session>, frame: &[u8]) -> Receipt {
        let span = tracing::debug_span!("packet", conn_id = %session.id());
        let _entered = span.enter();
        receive(&self.registry, &self.dispatcher, self, session, frame)
    }

    /// Tears down everything `id` owned.
    ///
    /// A host's room is destroyed (other occupants are told), a member is
    /// removed from its room (the roster is re-sent), and the session is
    /// forgotten. Returns `None` if `id` was not live.
    pub fn on_disconnected(&self, id: ConnectionId) -> Option<Departure> {
        let session = match self.sessions.lock().disconnect(id) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "disconnect for unknown session");
                return None;
            }
        };
        let departure = self.rooms.depart(&session);
        tracing::info!(
            conn_id = %id,
            name = %session.display_name(),
            ?departure,
            "client disconnected"
        );
        Some(departure)
    }

    // -- Room operations -----------------------------------------------------

    /// Creates a room hosted by `host`. The host receives `RoomCreated`,
    /// or `RoomError(AlreadyInRoom)` if it is already in a room.
    pub fn create_room(&self, host: &Arc<Session>) {
        if let Err(e) = self.rooms.create(host) {
            refuse(host, &e);
        }
    }

    /// Puts `session` into room `code`. The requester receives
    /// `RoomJoined` followed by the roster, or a single `RoomError`.
    pub fn join_room(&self, session: &Arc<Session>, code: &RoomCode) {
        if let Err(e) = self.rooms.join(session, code) {
            refuse(session, &e);
        }
    }

    /// Destroys the room `session` hosts.
    ///
    /// Members and non-members get `RoomError(NotHost)` and
    /// `RoomError(NotInRoom)` respectively.
    pub fn destroy_room(&self, session: &Arc<Session>) {
        if let Err(e) = self.rooms.destroy_by(session) {
            refuse(session, &e);
        }
    }

    /// Sets the display name of `session`. Rosters already sent are not
    /// refreshed.
    pub fn rename(&self, session: &Arc<Session>, name: String) {
        tracing::info!(conn_id = %session.id(), %name, "client named");
        session.set_name(name);
    }
}

/// Tells `session` its request was refused.
fn refuse(session: &Session, error: &RoomError) {
    tracing::info!(conn_id = %session.id(), %error, "room request refused");
    session.send_packet(roomlink_protocol::RoomError { code: error.code() });
}

// ---------------------------------------------------------------------------
// Network server
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Roomlink server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), roomlink::RoomlinkError> {
/// let server = roomlink::RoomlinkServer::builder()
///     .bind("127.0.0.1:29563")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RoomlinkServerBuilder {
    bind_addr: String,
    registry: Option<Arc<PacketRegistry>>,
}

impl RoomlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", crate::config::DEFAULT_PORT),
            registry: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Uses `registry` instead of the full catalog.
    pub fn registry(mut self, registry: Arc<PacketRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Binds the listener.
    pub async fn build(self) -> Result<RoomlinkServer, RoomlinkError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(PacketRegistry::with_catalog()));
        Ok(RoomlinkServer {
            transport,
            server: Arc::new(Server::new(registry)),
        })
    }
}

impl Default for RoomlinkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Roomlink server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RoomlinkServer {
    transport: WebSocketTransport,
    server: Arc<Server>,
}

impl RoomlinkServer {
    /// Creates a new builder.
    pub fn builder() -> RoomlinkServerBuilder {
        RoomlinkServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The shared server state, for inspection.
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RoomlinkError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops
    /// accepting. Connections already open keep running.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RoomlinkError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Roomlink server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutting down");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let server = Arc::clone(&self.server);
                        let span = tracing::info_span!("conn", conn_id = %conn.id());
                        tokio::spawn(
                            async move {
                                if let Err(e) = handle_connection(conn, server).await {
                                    tracing::debug!(error = %e, "connection ended with error");
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        Ok(())
    }
}
