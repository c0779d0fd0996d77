//! The packet catalog: every message kind Roomlink peers exchange.
//!
//! Each kind is its own struct implementing [`PacketBody`], so handlers
//! receive exactly the fields they need with no runtime casting. The
//! [`Packet`] enum is the tagged union over all of them and
//! [`PacketKind`] is its field-less discriminant, which is what the
//! registry and dispatcher key on.
//!
//! | Kind | Direction | Payload |
//! |---|---|---|
//! | [`Heartbeat`] | client → server | none |
//! | [`RequestRoomHost`] | client → server | none |
//! | [`RequestRoomJoin`] | client → server | room code |
//! | [`RoomCreated`] | server → client | room code |
//! | [`RoomJoined`] | server → client | none |
//! | [`RoomPlayerListUpdated`] | server → client | display names |
//! | [`RoomError`] | server → client | error code |
//! | [`RoomDestroyed`] | server → client | none |
//! | [`SendName`] | client → server | display name |
//! | [`RequestRoomDestroy`] | client → server | none |

use std::fmt;

use bytes::{Buf, BufMut};

use crate::codec::{
    read_i32, read_string, read_string_list, write_i32, write_string,
    write_string_list,
};
use crate::{ProtocolError, RoomCode, RoomErrorCode};

/// A concrete packet type with its own wire body.
///
/// `Default` is the blank instance the registry hands out before the
/// body has been read. The conversions to and from [`Packet`] are
/// generated by the catalog below.
pub trait PacketBody:
    Sized
    + Default
    + Clone
    + fmt::Debug
    + PartialEq
    + Send
    + Sync
    + Into<Packet>
    + TryFrom<Packet, Error = Packet>
    + 'static
{
    /// The catalog entry this type belongs to.
    const KIND: PacketKind;

    /// Writes the body (everything after the packet id).
    fn encode_body(&self, dst: &mut impl BufMut);

    /// Reads the body (everything after the packet id).
    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError>;
}

/// Declares the catalog: the `PacketKind` and `Packet` enums plus the
/// per-kind conversions. Each listed type must implement `PacketBody`.
macro_rules! packet_catalog {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        /// Field-less tag for each packet kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PacketKind {
            $($(#[$meta])* $name,)+
        }

        impl PacketKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [PacketKind] = &[$(PacketKind::$name,)+];

            /// The kind's type name, for logs.
            pub fn name(self) -> &'static str {
                match self {
                    $(PacketKind::$name => stringify!($name),)+
                }
            }

            /// A fresh instance with every field at its default, ready to
            /// be filled by [`Packet::decode_into`].
            pub fn blank(self) -> Packet {
                match self {
                    $(PacketKind::$name => Packet::$name($name::default()),)+
                }
            }
        }

        /// A decoded packet of any kind.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Packet {
            $($(#[$meta])* $name($name),)+
        }

        impl Packet {
            /// Returns this packet's kind.
            pub fn kind(&self) -> PacketKind {
                match self {
                    $(Packet::$name(_) => PacketKind::$name,)+
                }
            }

            /// Writes the body (everything after the packet id).
            pub fn encode_body(&self, dst: &mut impl BufMut) {
                match self {
                    $(Packet::$name(body) => body.encode_body(dst),)+
                }
            }

            /// Reads a body of the given kind.
            pub fn decode_body(
                kind: PacketKind,
                src: &mut impl Buf,
            ) -> Result<Packet, ProtocolError> {
                match kind {
                    $(PacketKind::$name => {
                        $name::decode_body(src).map(Packet::$name)
                    })+
                }
            }
        }

        $(
            impl From<$name> for Packet {
                fn from(body: $name) -> Self {
                    Packet::$name(body)
                }
            }

            impl TryFrom<Packet> for $name {
                type Error = Packet;

                fn try_from(packet: Packet) -> Result<Self, Packet> {
                    match packet {
                        Packet::$name(body) => Ok(body),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

packet_catalog! {
    /// Client keep-alive.
    Heartbeat,
    /// Client asks to open a new room and become its host.
    RequestRoomHost,
    /// Client asks to join the room with the given code.
    RequestRoomJoin,
    /// Server tells a host the code of the room it now owns.
    RoomCreated,
    /// Server confirms a join request.
    RoomJoined,
    /// Server pushes the current guest roster of a room.
    RoomPlayerListUpdated,
    /// Server refuses a room request.
    RoomError,
    /// Server announces that the room is gone.
    RoomDestroyed,
    /// Client sets its display name.
    SendName,
    /// Host asks to close its room.
    RequestRoomDestroy,
}

impl Packet {
    /// Re-reads this packet's body from `src`, replacing its fields.
    ///
    /// This is the second half of decoding: the registry produces a
    /// blank packet from the id, then the body fills it in. On error the
    /// packet is left unchanged.
    pub fn decode_into(
        &mut self,
        src: &mut impl Buf,
    ) -> Result<(), ProtocolError> {
        *self = Packet::decode_body(self.kind(), src)?;
        Ok(())
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Implements `PacketBody` for a packet with no payload.
macro_rules! empty_body {
    ($($name:ident),+ $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` packet. No payload.")]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl PacketBody for $name {
                const KIND: PacketKind = PacketKind::$name;

                fn encode_body(&self, _dst: &mut impl BufMut) {}

                fn decode_body(_src: &mut impl Buf) -> Result<Self, ProtocolError> {
                    Ok($name)
                }
            }
        )+
    };
}

empty_body!(
    Heartbeat,
    RequestRoomHost,
    RoomJoined,
    RoomDestroyed,
    RequestRoomDestroy,
);

// ---------------------------------------------------------------------------
// Packets with payloads
// ---------------------------------------------------------------------------

/// Join request carrying the code the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestRoomJoin {
    /// The code as typed; may need [`RoomCode::normalized`].
    pub room_code: RoomCode,
}

impl PacketBody for RequestRoomJoin {
    const KIND: PacketKind = PacketKind::RequestRoomJoin;

    fn encode_body(&self, dst: &mut impl BufMut) {
        write_string(dst, self.room_code.as_str());
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_code: RoomCode::new(read_string(src)?),
        })
    }
}

/// Tells a host which code its new room got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomCreated {
    /// Code guests type to join.
    pub room_code: RoomCode,
}

impl PacketBody for RoomCreated {
    const KIND: PacketKind = PacketKind::RoomCreated;

    fn encode_body(&self, dst: &mut impl BufMut) {
        write_string(dst, self.room_code.as_str());
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_code: RoomCode::new(read_string(src)?),
        })
    }
}

/// The guest roster of a room, in join order. The host is not listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPlayerListUpdated {
    /// Display names (or connection ids for unnamed guests).
    pub players: Vec<String>,
}

impl PacketBody for RoomPlayerListUpdated {
    const KIND: PacketKind = PacketKind::RoomPlayerListUpdated;

    fn encode_body(&self, dst: &mut impl BufMut) {
        write_string_list(dst, &self.players);
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            players: read_string_list(src)?,
        })
    }
}

/// A refused room request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomError {
    /// Why the request was refused.
    pub code: RoomErrorCode,
}

impl PacketBody for RoomError {
    const KIND: PacketKind = PacketKind::RoomError;

    fn encode_body(&self, dst: &mut impl BufMut) {
        write_i32(dst, self.code.code());
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            code: RoomErrorCode::from(read_i32(src)?),
        })
    }
}

/// Sets the sender's display name. The server does not reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendName {
    /// The new display name.
    pub name: String,
}

impl PacketBody for SendName {
    const KIND: PacketKind = PacketKind::SendName;

    fn encode_body(&self, dst: &mut impl BufMut) {
        write_string(dst, &self.name);
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: read_string(src)?,
        })
    }
}
