//! The client side of a Roomlink connection.
//!
//! A [`Client`] dials the server, sends typed requests, and keeps a
//! [`Lobby`] mirror of what the server has told it. Every server packet it
//! handles is also published as a [`LobbyEvent`], which is what a UI (or a
//! test) waits on.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), roomlink::RoomlinkError> {
//! use std::sync::Arc;
//! use roomlink::{Client, LobbyEvent};
//! use roomlink_protocol::PacketRegistry;
//!
//! let registry = Arc::new(PacketRegistry::with_catalog());
//! let (client, mut events) = Client::connect("127.0.0.1:29563", registry).await?;
//! client.set_name("ada");
//! client.host_room();
//! if let Some(LobbyEvent::RoomCreated(code)) = events.recv().await {
//!     println!("share this code: {code}");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use roomlink_protocol::{
    Dispatcher, HandlerResult, Heartbeat, PacketRegistry, PacketSink,
    RequestRoomDestroy, RequestRoomHost, RequestRoomJoin, RoomCode,
    RoomCreated, RoomDestroyed, RoomError, RoomErrorCode, RoomJoined,
    RoomPlayerListUpdated, SendName, receive,
};
use roomlink_transport::{
    ClientWebSocketConnection, Connection, ConnectionId, TransportError,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::RoomlinkError;

/// How long [`Client::close`] waits for queued packets to go out.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Lobby mirror
// ---------------------------------------------------------------------------

/// What the client knows about its room, as last reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lobby {
    /// The room this client hosts or has joined.
    pub room: Option<RoomCode>,
    /// Guest display names, in join order. The host is not listed.
    pub roster: Vec<String>,
    /// The most recent refusal, cleared by the next success.
    pub last_error: Option<RoomErrorCode>,
    /// Set when the server tore down the room this client was in.
    pub destroyed: bool,
}

/// One server notification, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// This client now hosts the room with this code.
    RoomCreated(RoomCode),
    /// A join request succeeded.
    RoomJoined,
    /// The guest roster changed.
    RosterUpdated(Vec<String>),
    /// A request was refused.
    Error(RoomErrorCode),
    /// The room this client was in no longer exists.
    RoomDestroyed,
    /// The server closed the connection. No further events follow.
    Disconnected,
}

/// State the client handlers mutate.
pub(crate) struct ClientState {
    lobby: Mutex<Lobby>,
    /// Code of the join request awaiting an answer. `RoomJoined` carries
    /// no code, so this is where the lobby learns which room it entered.
    pending_join: Mutex<Option<RoomCode>>,
    events: mpsc::UnboundedSender<LobbyEvent>,
}

impl ClientState {
    fn new(events: mpsc::UnboundedSender<LobbyEvent>) -> Self {
        Self {
            lobby: Mutex::new(Lobby::default()),
            pending_join: Mutex::new(None),
            events,
        }
    }

    fn publish(&self, event: LobbyEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Client handlers
// ---------------------------------------------------------------------------

/// Builds the client's handler table: one entry per server-to-client
/// packet kind.
pub(crate) fn client_dispatcher() -> Dispatcher<ClientState> {
    let mut dispatcher = Dispatcher::client();
    dispatcher
        .register_client(on_room_created)
        .register_client(on_room_joined)
        .register_client(on_room_player_list_updated)
        .register_client(on_room_error)
        .register_client(on_room_destroyed);
    dispatcher
}

fn on_room_created(state: &ClientState, packet: RoomCreated) -> HandlerResult {
    tracing::info!(room = %packet.room_code, "room created");
    {
        let mut lobby = state.lobby.lock();
        lobby.room = Some(packet.room_code.clone());
        lobby.roster.clear();
        lobby.last_error = None;
        lobby.destroyed = false;
    }
    state.publish(LobbyEvent::RoomCreated(packet.room_code));
    Ok(())
}

fn on_room_joined(state: &ClientState, _packet: RoomJoined) -> HandlerResult {
    let code = state.pending_join.lock().take();
    tracing::info!(room = ?code, "joined room");
    {
        let mut lobby = state.lobby.lock();
        if code.is_some() {
            lobby.room = code;
        }
        lobby.last_error = None;
        lobby.destroyed = false;
    }
    state.publish(LobbyEvent::RoomJoined);
    Ok(())
}

fn on_room_player_list_updated(
    state: &ClientState,
    packet: RoomPlayerListUpdated,
) -> HandlerResult {
    tracing::debug!(players = ?packet.players, "roster updated");
    state.lobby.lock().roster = packet.players.clone();
    state.publish(LobbyEvent::RosterUpdated(packet.players));
    Ok(())
}

fn on_room_error(state: &ClientState, packet: RoomError) -> HandlerResult {
    tracing::warn!(code = %packet.code, "room request refused");
    state.pending_join.lock().take();
    state.lobby.lock().last_error = Some(packet.code);
    state.publish(LobbyEvent::Error(packet.code));
    Ok(())
}

fn on_room_destroyed(state: &ClientState, _packet: RoomDestroyed) -> HandlerResult {
    tracing::warn!("room destroyed");
    {
        let mut lobby = state.lobby.lock();
        lobby.room = None;
        lobby.roster.clear();
        lobby.destroyed = true;
    }
    state.publish(LobbyEvent::RoomDestroyed);
    Ok(())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connection to a Roomlink server.
///
/// Requests are fire-and-forget: each method queues one packet and
/// returns. Outcomes arrive as [`LobbyEvent`]s and in [`lobby`](Self::lobby).
pub struct Client {
    id: ConnectionId,
    conn: Arc<ClientWebSocketConnection>,
    registry: Arc<PacketRegistry>,
    outbound: mpsc::UnboundedSender<Bytes>,
    state: Arc<ClientState>,
    name: Mutex<Option<String>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Client {
    /// Dials `addr` (`host:port`) and starts the reader and writer tasks.
    ///
    /// `registry` must have been built in the same order as the server's.
    /// Returns the client and the stream of lobby events.
    pub async fn connect(
        addr: &str,
        registry: Arc<PacketRegistry>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LobbyEvent>), RoomlinkError> {
        let conn = Arc::new(ClientWebSocketConnection::connect(addr).await?);
        let id = conn.id();
        tracing::info!(%addr, conn_id = %id, "connected to server");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(ClientState::new(events_tx));
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();

        let writer = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move {
                while let Some(frame) = outbound_rx.recv().await {
                    if let Err(e) = conn.send(frame).await {
                        tracing::debug!(error = %e, "send failed, stopping writer");
                        break;
                    }
                }
            }
        });

        let reader = tokio::spawn({
            let conn = Arc::clone(&conn);
            let registry = Arc::clone(&registry);
            let state = Arc::clone(&state);
            async move {
                let dispatcher = client_dispatcher();
                loop {
                    match conn.recv().await {
                        Ok(Some(data)) => {
                            receive(&registry, &dispatcher, &*state, &(), &data);
                        }
                        Ok(None) => {
                            tracing::info!("server closed the connection");
                            break;
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "recv error");
                            break;
                        }
                    }
                }
                state.publish(LobbyEvent::Disconnected);
            }
        });

        let client = Self {
            id,
            conn,
            registry,
            outbound,
            state,
            name: Mutex::new(None),
            reader,
            writer,
        };
        Ok((client, events_rx))
    }

    /// Snapshot of the lobby mirror.
    pub fn lobby(&self) -> Lobby {
        self.state.lobby.lock().clone()
    }

    /// The name last sent with [`set_name`](Self::set_name).
    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Sends the display name others will see. The server does not
    /// acknowledge it.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        *self.name.lock() = Some(name.clone());
        self.send_packet(SendName { name });
    }

    /// Asks the server to create a room hosted by this client.
    pub fn host_room(&self) {
        self.send_packet(RequestRoomHost);
    }

    /// Asks to join the room with `code`. Case and surrounding
    /// whitespace do not matter.
    pub fn join_room(&self, code: impl Into<RoomCode>) {
        let room_code = code.into();
        *self.state.pending_join.lock() = Some(room_code.normalized());
        self.send_packet(RequestRoomJoin { room_code });
    }

    /// Asks the server to destroy the room this client hosts.
    pub fn destroy_room(&self) {
        self.send_packet(RequestRoomDestroy);
    }

    /// Sends a keep-alive.
    pub fn heartbeat(&self) {
        self.send_packet(Heartbeat);
    }

    /// Flushes queued packets, sends a close frame, and stops the reader
    /// and writer tasks.
    pub async fn close(mut self) {
        tracing::debug!(conn_id = %self.id, "closing client");

        // Dropping the only sender ends the writer once the queue is empty.
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.outbound, closed));
        match tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, &mut self.writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "writer task failed"),
            Err(_) => tracing::warn!(conn_id = %self.id, "outbound queue did not drain"),
        }

        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "close failed");
        }
    }
}

impl PacketSink for Client {
    fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    fn write_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed("client writer stopped".into()))
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        Some(self.id)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use roomlink_protocol::{Packet, PacketKind, Receipt, encode_frame};

    use super::*;

    fn state() -> (ClientState, mpsc::UnboundedReceiver<LobbyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientState::new(tx), rx)
    }

    fn deliver(state: &ClientState, packet: impl Into<Packet>) -> Receipt {
        let registry = PacketRegistry::with_catalog();
        let packet = packet.into();
        let frame = encode_frame(registry.id_of(packet.kind()).unwrap(), &packet);
        receive(&registry, &client_dispatcher(), state, &(), &frame)
    }

    #[test]
    fn test_client_handles_exactly_server_notifications() {
        let dispatcher = client_dispatcher();
        for kind in [
            PacketKind::RoomCreated,
            PacketKind::RoomJoined,
            PacketKind::RoomPlayerListUpdated,
            PacketKind::RoomError,
            PacketKind::RoomDestroyed,
        ] {
            assert!(dispatcher.handles(kind), "{kind} unhandled");
        }
        assert!(!dispatcher.handles(PacketKind::RequestRoomHost));
        assert_eq!(dispatcher.len(), 5);
    }

    #[test]
    fn test_room_created_sets_room_and_publishes() {
        let (state, mut rx) = state();
        deliver(&state, RoomCreated { room_code: RoomCode::new("QWE12") });

        assert_eq!(state.lobby.lock().room, Some(RoomCode::new("QWE12")));
        assert_eq!(rx.try_recv().unwrap(), LobbyEvent::RoomCreated(RoomCode::new("QWE12")));
    }

    #[test]
    fn test_error_then_success_clears_last_error() {
        let (state, mut rx) = state();
        deliver(&state, RoomError { code: RoomErrorCode::NotExisting });
        assert_eq!(state.lobby.lock().last_error, Some(RoomErrorCode::NotExisting));

        deliver(&state, RoomJoined);
        assert_eq!(state.lobby.lock().last_error, None);
        assert_eq!(rx.try_recv().unwrap(), LobbyEvent::Error(RoomErrorCode::NotExisting));
        assert_eq!(rx.try_recv().unwrap(), LobbyEvent::RoomJoined);
    }

    #[test]
    fn test_joined_records_pending_code() {
        let (state, _rx) = state();
        *state.pending_join.lock() = Some(RoomCode::new("QWE12"));

        deliver(&state, RoomJoined);
        assert_eq!(state.lobby.lock().room, Some(RoomCode::new("QWE12")));
        assert_eq!(*state.pending_join.lock(), None);
    }

    #[test]
    fn test_refused_join_leaves_room_unset() {
        let (state, _rx) = state();
        *state.pending_join.lock() = Some(RoomCode::new("ZZZZZ"));

        deliver(&state, RoomError { code: RoomErrorCode::NotExisting });
        assert_eq!(*state.pending_join.lock(), None);

        // A stray RoomJoined after the refusal must not resurrect the code.
        deliver(&state, RoomJoined);
        assert_eq!(state.lobby.lock().room, None);
    }

    #[test]
    fn test_roster_then_destroy() {
        let (state, _rx) = state();
        deliver(&state, RoomCreated { room_code: RoomCode::new("QWE12") });
        deliver(&state, RoomPlayerListUpdated { players: vec!["a".into(), "b".into()] });
        assert_eq!(state.lobby.lock().roster, vec!["a", "b"]);

        deliver(&state, RoomDestroyed);
        let lobby = state.lobby.lock().clone();
        assert_eq!(lobby.room, None);
        assert!(lobby.roster.is_empty());
        assert!(lobby.destroyed);
    }

    #[test]
    fn test_handler_survives_dropped_event_receiver() {
        let (state, rx) = state();
        drop(rx);
        let receipt = deliver(&state, RoomJoined);
        assert_eq!(receipt, Receipt::Handled(PacketKind::RoomJoined));
    }
}
