//! Identity and value types shared by the packet catalog.

use std::fmt;

// ---------------------------------------------------------------------------
// PacketId
// ---------------------------------------------------------------------------

/// The small integer that tags a packet kind on the wire.
///
/// Ids are handed out by [`PacketRegistry`](crate::PacketRegistry) in
/// registration order, starting at 1. They are not stable across builds:
/// both peers must register the same kinds in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(i32);

impl PacketId {
    /// Wraps a raw wire id.
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw wire id.
    pub fn into_inner(self) -> i32 {
        self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Characters a generated room code is drawn from.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a generated room code.
pub const ROOM_CODE_LEN: usize = 5;

/// The short, human-typed code that names a live room, e.g. `"K7Q2D"`.
///
/// A `RoomCode` decoded from the wire holds whatever the peer sent, so it
/// may be malformed. [`RoomCode::normalized`] turns typed input into the
/// canonical form used for lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a code verbatim.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the canonical form: surrounding whitespace removed,
    /// letters upper-cased.
    pub fn normalized(&self) -> Self {
        Self(self.0.trim().to_ascii_uppercase())
    }

    /// Returns `true` if this is exactly [`ROOM_CODE_LEN`] characters
    /// from [`ROOM_CODE_ALPHABET`].
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ROOM_CODE_LEN
            && self.0.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// ---------------------------------------------------------------------------
// RoomErrorCode
// ---------------------------------------------------------------------------

/// Why a room request was refused. Travels as an `i32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RoomErrorCode {
    /// No live room has the requested code.
    #[default]
    NotExisting,
    /// The requester already hosts or belongs to a room.
    AlreadyInRoom,
    /// Only the host may do this.
    NotHost,
    /// The requester is not in any room.
    NotInRoom,
    /// A code this build does not know. Kept so decoding is total.
    Other(UnknownErrorCode),
}

/// A wire value outside the known [`RoomErrorCode`] range.
///
/// Only [`RoomErrorCode::from`] builds one, so `Other` never shadows a
/// known variant and every code survives an encode/decode cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnknownErrorCode(i32);

impl UnknownErrorCode {
    /// Returns the raw wire value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl RoomErrorCode {
    /// Returns the wire value.
    pub fn code(self) -> i32 {
        match self {
            Self::NotExisting => 0,
            Self::AlreadyInRoom => 1,
            Self::NotHost => 2,
            Self::NotInRoom => 3,
            Self::Other(code) => code.get(),
        }
    }
}

impl From<i32> for RoomErrorCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::NotExisting,
            1 => Self::AlreadyInRoom,
            2 => Self::NotHost,
            3 => Self::NotInRoom,
            other => Self::Other(UnknownErrorCode(other)),
        }
    }
}

impl fmt::Display for RoomErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotExisting => f.write_str("room does not exist"),
            Self::AlreadyInRoom => f.write_str("already in a room"),
            Self::NotHost => f.write_str("only the host may do that"),
            Self::NotInRoom => f.write_str("not in a room"),
            Self::Other(code) => write!(f, "room error {}", code.get()),
        }
    }
}
