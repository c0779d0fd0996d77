//! The room table: every live room on the server, plus the operations
//! that create, join, and tear them down.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use roomlink_protocol::{
    PacketSink, ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode, RoomCreated,
    RoomDestroyed, RoomJoined,
};
use roomlink_session::Session;

use crate::{Room, RoomError, SyncList};

/// Draws a random room code from [`ROOM_CODE_ALPHABET`].
///
/// Uniqueness is the table's job, not this function's.
pub fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..ROOM_CODE_LEN)
        .map(|_| {
            let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            char::from(ROOM_CODE_ALPHABET[index])
        })
        .collect();
    RoomCode::new(code)
}

/// Why a room was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    /// The host's connection went away. The host is not notified.
    HostDisconnect,
    /// The host asked for it. The host is notified like everyone else.
    HostRequest,
}

impl fmt::Display for DestroyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostDisconnect => write!(f, "HOST_DISCONNECT"),
            Self::HostRequest => write!(f, "HOST_MANUALLY"),
        }
    }
}

/// What a disconnecting session's departure did to its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The session was in no room.
    NoRoom,
    /// The session hosted this room, which is now destroyed.
    Destroyed(RoomCode),
    /// The session was a member of this room and has been removed.
    Left(RoomCode),
}

/// The authoritative set of live rooms.
///
/// A room is in the table from [`create`](Self::create) until
/// [`destroy`](Self::destroy). Nothing else removes it.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: SyncList<Arc<Room>>,
}

impl RoomTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room hosted by `host` and tells the host its code.
    ///
    /// Code generation, the uniqueness check, and the insert happen under
    /// one lock, so concurrent creates never share a code.
    ///
    /// # Errors
    /// Returns [`RoomError::AlreadyInRoom`] if `host` already hosts or
    /// belongs to a room. Nothing is created.
    pub fn create(&self, host: &Arc<Session>) -> Result<Arc<Room>, RoomError> {
        if let Some(current) = host.current_room() {
            return Err(RoomError::AlreadyInRoom(host.id(), current));
        }

        let room = self.rooms.update(|rooms| {
            let code = loop {
                let candidate = generate_code();
                if !rooms.iter().any(|room| room.code() == &candidate) {
                    break candidate;
                }
                tracing::debug!(code = %candidate, "room code collision, retrying");
            };
            if !host.claim_room(code.clone()) {
                let current = host.current_room().unwrap_or_default();
                return Err(RoomError::AlreadyInRoom(host.id(), current));
            }
            let room = Arc::new(Room::new(code, Arc::clone(host)));
            rooms.push(Arc::clone(&room));
            Ok(room)
        })?;

        tracing::info!(
            room = %room.code(),
            host = %host.id(),
            live_rooms = self.rooms.len(),
            "room created"
        );
        host.send_packet(RoomCreated {
            room_code: room.code().clone(),
        });
        Ok(room)
    }

    /// Puts `session` into the room named by `code`.
    ///
    /// `code` is normalized first, so `" abc12 "` finds `ABC12`. On
    /// success the session's room slot is set, it receives `RoomJoined`,
    /// and then every occupant receives the new roster.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: no live room has this code
    /// - [`RoomError::AlreadyInRoom`]: the session is already in a room
    /// - [`RoomError::Destroyed`]: the room was torn down mid-join
    pub fn join(
        &self,
        session: &Arc<Session>,
        code: &RoomCode,
    ) -> Result<Arc<Room>, RoomError> {
        let code = code.normalized();
        if let Some(current) = session.current_room() {
            return Err(RoomError::AlreadyInRoom(session.id(), current));
        }
        let room = self.get(&code).ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if !session.claim_room(code.clone()) {
            let current = session.current_room().unwrap_or_default();
            return Err(RoomError::AlreadyInRoom(session.id(), current));
        }
        session.send_packet(RoomJoined);

        if let Err(e) = room.add_client(Arc::clone(session)) {
            session.leave_room(&code);
            return Err(e);
        }
        Ok(room)
    }

    /// Removes the room named `code`, notifies its occupants, and clears
    /// every room slot that still points at it.
    ///
    /// The host is left out of the notice when it caused the teardown by
    /// disconnecting. Returns the removed room, or `None` if no live room
    /// had this code.
    pub fn destroy(&self, code: &RoomCode, cause: DestroyCause) -> Option<Arc<Room>> {
        let room = self.rooms.remove_where(|room| room.code() == code)?;
        let members = room.close()?;

        if cause != DestroyCause::HostDisconnect {
            room.host().send_packet(RoomDestroyed);
        }
        for member in &members {
            member.send_packet(RoomDestroyed);
        }

        room.host().leave_room(code);
        for member in &members {
            member.leave_room(code);
        }

        tracing::warn!(
            room = %code,
            %cause,
            members = members.len(),
            live_rooms = self.rooms.len(),
            "room destroyed"
        );
        Some(room)
    }

    /// Destroys the room `session` hosts, at its request.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`]: the session is in no live room
    /// - [`RoomError::NotHost`]: the session is a member, not the host
    pub fn destroy_by(&self, session: &Arc<Session>) -> Result<RoomCode, RoomError> {
        let code = session
            .current_room()
            .ok_or(RoomError::NotInRoom(session.id()))?;
        let Some(room) = self.get(&code) else {
            session.leave_room(&code);
            return Err(RoomError::NotInRoom(session.id()));
        };
        if !room.is_host(session) {
            return Err(RoomError::NotHost(session.id(), code));
        }
        self.destroy(&code, DestroyCause::HostRequest);
        Ok(code)
    }

    /// Applies a disconnect to whatever room `session` is in.
    ///
    /// A host's room is destroyed without notifying the host; a member is
    /// removed and the remaining occupants get the new roster. Either way
    /// the session's room slot ends up empty.
    pub fn depart(&self, session: &Arc<Session>) -> Departure {
        let Some(code) = session.current_room() else {
            return Departure::NoRoom;
        };
        let Some(room) = self.get(&code) else {
            session.leave_room(&code);
            return Departure::NoRoom;
        };

        if room.is_host(session) {
            self.destroy(&code, DestroyCause::HostDisconnect);
            Departure::Destroyed(code)
        } else {
            room.remove_client(session);
            session.leave_room(&code);
            Departure::Left(code)
        }
    }

    /// Looks up a live room by its exact code.
    pub fn get(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.find(|room| room.code() == code)
    }

    /// Codes of every live room, in creation order.
    pub fn codes(&self) -> Vec<RoomCode> {
        self.rooms
            .snapshot()
            .iter()
            .map(|room| room.code().clone())
            .collect()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if there are no live rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
