//! Unified error type for Roomlink.

use roomlink_protocol::ProtocolError;
use roomlink_room::RoomError;
use roomlink_session::SessionError;
use roomlink_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomlinkError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed packet.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-table error (duplicate or missing connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A refused room request.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Configuration could not be loaded. Fatal at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
