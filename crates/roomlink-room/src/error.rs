//! Error types for the room layer.

use roomlink_protocol::{RoomCode, RoomErrorCode};
use roomlink_transport::ConnectionId;

/// Errors that can occur during room operations.
///
/// Every variant maps to the [`RoomErrorCode`] the requester is told
/// about; see [`RoomError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room was destroyed while the request was in flight.
    #[error("room {0} was destroyed")]
    Destroyed(RoomCode),

    /// The session already hosts or belongs to a room.
    #[error("{0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomCode),

    /// The session is a member of the room but not its host.
    #[error("{0} is not the host of room {1}")]
    NotHost(ConnectionId, RoomCode),

    /// The session is not in any room.
    #[error("{0} is not in a room")]
    NotInRoom(ConnectionId),
}

impl RoomError {
    /// The code sent back to the client in a `RoomError` packet.
    pub fn code(&self) -> RoomErrorCode {
        match self {
            Self::NotFound(_) | Self::Destroyed(_) => RoomErrorCode::NotExisting,
            Self::AlreadyInRoom(..) => RoomErrorCode::AlreadyInRoom,
            Self::NotHost(..) => RoomErrorCode::NotHost,
            Self::NotInRoom(_) => RoomErrorCode::NotInRoom,
        }
    }
}
