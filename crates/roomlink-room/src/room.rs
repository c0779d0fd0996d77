//! A single room: its host, its members, and broadcasting to them.

use std::sync::Arc;

use parking_lot::Mutex;
use roomlink_protocol::{Packet, PacketSink, RoomCode, RoomPlayerListUpdated};
use roomlink_session::Session;

use crate::{RoomError, RoomState, SyncList};

/// A host-owned group of sessions sharing broadcast state.
///
/// ## Invariants
///
/// - The host never appears in `members`.
/// - A session appears in `members` at most once.
/// - Once `Destroyed`, membership never changes again. The state is
///   only read or written while the member lock is held, so a join
///   racing a teardown either lands before the teardown snapshot or is
///   refused.
pub struct Room {
    code: RoomCode,
    host: Arc<Session>,
    members: SyncList<Arc<Session>>,
    state: Mutex<RoomState>,
}

impl Room {
    /// Creates a room hosted by `host`, with no members.
    pub fn new(code: RoomCode, host: Arc<Session>) -> Self {
        Self {
            code,
            host,
            members: SyncList::new(),
            state: Mutex::new(RoomState::Created),
        }
    }

    /// The code players type to join this room.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The session that created the room.
    pub fn host(&self) -> &Arc<Session> {
        &self.host
    }

    /// Returns `true` if `session` is this room's host.
    pub fn is_host(&self, session: &Session) -> bool {
        self.host.id() == session.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RoomState {
        *self.state.lock()
    }

    /// Snapshot of the members in join order. Does not include the host.
    pub fn members(&self) -> Vec<Arc<Session>> {
        self.members.snapshot()
    }

    /// Display names of the members, in join order. The host is not
    /// listed.
    pub fn player_list(&self) -> Vec<String> {
        self.members
            .snapshot()
            .iter()
            .map(|member| member.display_name())
            .collect()
    }

    /// Adds `session` as a member and sends everyone the new roster.
    ///
    /// Adding the host or an existing member changes nothing and sends
    /// nothing.
    ///
    /// # Errors
    /// Returns [`RoomError::Destroyed`] if the room has been torn down.
    pub fn add_client(&self, session: Arc<Session>) -> Result<(), RoomError> {
        if self.is_host(&session) {
            return Ok(());
        }

        let added = self.members.update(|members| {
            let mut state = self.state.lock();
            if !state.can_transition_to(RoomState::Active) {
                return Err(RoomError::Destroyed(self.code.clone()));
            }
            if members.contains(&session) {
                return Ok(false);
            }
            members.push(Arc::clone(&session));
            *state = RoomState::Active;
            Ok(true)
        })?;

        if added {
            tracing::info!(
                room = %self.code,
                conn_id = %session.id(),
                name = %session.display_name(),
                "client joined room"
            );
            self.broadcast_roster();
        }
        Ok(())
    }

    /// Removes `session` and sends the remaining members the new roster.
    ///
    /// Returns `false`, sending nothing, if it was not a member or the
    /// room is already destroyed. Occupants of a destroyed room have had
    /// their last notice.
    pub fn remove_client(&self, session: &Arc<Session>) -> bool {
        let removed = self.members.update(|members| {
            if !self.state.lock().is_live() {
                return false;
            }
            match members.iter().position(|member| member == session) {
                Some(index) => {
                    members.remove(index);
                    true
                }
                None => false,
            }
        });
        if !removed {
            return false;
        }
        tracing::info!(
            room = %self.code,
            conn_id = %session.id(),
            "client left room"
        );
        self.broadcast_roster();
        true
    }

    /// Sends `packet` to the host (unless `exclude_host`) and then to
    /// every member in join order.
    ///
    /// Iterates over a snapshot, so a member joining or leaving during the
    /// broadcast is either fully included or fully skipped. Each send only
    /// queues a frame, so one slow peer does not hold up the others.
    pub fn broadcast(&self, packet: &Packet, exclude_host: bool) {
        let members = self.members.snapshot();
        tracing::debug!(
            room = %self.code,
            kind = %packet.kind(),
            recipients = members.len() + usize::from(!exclude_host),
            "broadcasting"
        );
        if !exclude_host {
            self.host.send_packet(packet.clone());
        }
        for member in &members {
            member.send_packet(packet.clone());
        }
    }

    fn broadcast_roster(&self) {
        let roster = RoomPlayerListUpdated {
            players: self.player_list(),
        };
        self.broadcast(&roster.into(), false);
    }

    /// Marks the room destroyed and returns the final member list.
    ///
    /// Returns `None` if it was already destroyed.
    pub(crate) fn close(&self) -> Option<Vec<Arc<Session>>> {
        self.members.update(|members| {
            let mut state = self.state.lock();
            if !state.can_transition_to(RoomState::Destroyed) {
                return None;
            }
            *state = RoomState::Destroyed;
            Some(members.clone())
        })
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("host", &self.host.id())
            .field("members", &self.members.len())
            .field("state", &self.state())
            .finish()
    }
}
