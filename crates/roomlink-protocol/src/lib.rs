//! Wire protocol for Roomlink.
//!
//! This crate defines the language clients and servers speak:
//!
//! - **Packets** ([`Packet`], [`PacketKind`] and one struct per kind):
//!   the closed catalog of messages.
//! - **Codec** ([`encode_frame`], [`read_i32`], [`read_string`] and
//!   friends): the little-endian binary layout of frames and fields.
//! - **Registry** ([`PacketRegistry`]): the kind ↔ id bijection both
//!   peers derive from the same registration order.
//! - **Dispatch** ([`Dispatcher`], [`receive`], [`PacketSink`]): routing
//!   decoded packets to handlers and sending typed packets out.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → Session / Room (state)
//! ```
//!
//! The protocol layer knows nothing about rooms. Handlers are supplied
//! by the crate that owns the state they mutate.

mod codec;
mod connection;
mod dispatch;
mod error;
mod packets;
mod registry;
mod types;

pub use codec::{
    PACKET_ID_LEN, encode_frame, read_i32, read_packet_id, read_string,
    read_string_list, write_i32, write_string, write_string_list,
};
pub use connection::{PacketSink, Receipt, receive};
pub use dispatch::{Dispatcher, HandlerResult, Role};
pub use error::ProtocolError;
pub use packets::{
    Heartbeat, Packet, PacketBody, PacketKind, RequestRoomDestroy,
    RequestRoomHost, RequestRoomJoin, RoomCreated, RoomDestroyed, RoomError,
    RoomJoined, RoomPlayerListUpdated, SendName,
};
pub use registry::{CATALOG, PacketRegistry};
pub use types::{
    PacketId, ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode, RoomErrorCode,
    UnknownErrorCode,
};
