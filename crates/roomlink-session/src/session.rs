//! The server's record of one connected client.
//!
//! A session tracks:
//! - WHO the client is (`ConnectionId`, assigned by the transport)
//! - WHAT it calls itself (optional display name, set by `SendName`)
//! - WHERE it is (the code of its current room, if any)
//! - HOW to reach it (an unbounded queue drained by the connection's
//!   writer task)
//!
//! Handlers run synchronously, so every field sits behind a
//! `parking_lot` lock that is only ever held for one short operation.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use roomlink_protocol::{PacketRegistry, PacketSink, RoomCode};
use roomlink_transport::{ConnectionId, TransportError};
use tokio::sync::mpsc;

/// A single client's session on the server.
///
/// Sessions are shared as `Arc<Session>` between the session table, the
/// rooms the client belongs to, and its connection task. Two sessions
/// are equal when their connection ids are.
pub struct Session {
    id: ConnectionId,
    name: RwLock<Option<String>>,

    /// Lookup key into the room table. Non-owning: the room may already
    /// be gone when this is read.
    room: Mutex<Option<RoomCode>>,

    outbound: mpsc::UnboundedSender<Bytes>,
    registry: Arc<PacketRegistry>,
}

impl Session {
    /// Creates a session whose frames are pushed into `outbound`.
    pub fn new(
        id: ConnectionId,
        registry: Arc<PacketRegistry>,
        outbound: mpsc::UnboundedSender<Bytes>,
    ) -> Self {
        Self {
            id,
            name: RwLock::new(None),
            room: Mutex::new(None),
            outbound,
            registry,
        }
    }

    /// Creates a session together with the receiving end of its outbound
    /// queue. The connection's writer task owns the receiver.
    pub fn channel(
        id: ConnectionId,
        registry: Arc<PacketRegistry>,
    ) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, registry, tx), rx)
    }

    /// The transport-assigned identity of this session.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The name the client sent, if any.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// Replaces the display name. Nothing is broadcast.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = Some(name.into());
    }

    /// The name shown to other clients: the chosen name, or the
    /// connection id when none was sent.
    pub fn display_name(&self) -> String {
        match &*self.name.read() {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }

    /// The code of the room this session hosts or belongs to.
    pub fn current_room(&self) -> Option<RoomCode> {
        self.room.lock().clone()
    }

    /// Occupies the room slot with `code` if it is empty.
    ///
    /// Returns `false`, leaving the slot untouched, if the session is
    /// already in a room. Check and set happen under one lock.
    pub fn claim_room(&self, code: RoomCode) -> bool {
        let mut slot = self.room.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(code);
        true
    }

    /// Empties the room slot if it still points at `code`.
    ///
    /// Returns `true` if the slot was cleared.
    pub fn leave_room(&self, code: &RoomCode) -> bool {
        let mut slot = self.room.lock();
        if slot.as_ref() == Some(code) {
            *slot = None;
            return true;
        }
        false
    }

    /// Returns `false` once the connection's writer task has stopped.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

impl PacketSink for Session {
    fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    fn write_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        self.outbound.send(frame).map_err(|_| {
            TransportError::ConnectionClosed(format!(
                "{} outbound queue closed",
                self.id
            ))
        })
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        Some(self.id)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &*self.name.read())
            .field("room", &*self.room.lock())
            .finish()
    }
}
