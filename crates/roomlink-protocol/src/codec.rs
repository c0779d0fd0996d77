//! Binary wire primitives and packet framing.
//!
//! Every message on the wire is one frame:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┐
//! │ i32 LE packet id     │ packet-specific payload      │
//! └──────────────────────┴──────────────────────────────┘
//! ```
//!
//! Payload fields use three encodings:
//!
//! - `i32`: 4 bytes, little-endian
//! - string: `i32` byte length, then that many UTF-8 bytes
//! - string list: `i32` count, then that many strings
//!
//! Readers never panic on short input. `bytes::Buf::get_i32_le` would, so
//! every read checks [`Buf::remaining`] first and reports
//! [`ProtocolError::Truncated`] instead.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Packet, PacketId, ProtocolError};

/// Size of the packet id that prefixes every frame.
pub const PACKET_ID_LEN: usize = 4;

/// Size of every length or count prefix.
const LEN_PREFIX: usize = 4;

fn ensure(remaining: usize, needed: usize) -> Result<(), ProtocolError> {
    if remaining < needed {
        return Err(ProtocolError::Truncated { needed, remaining });
    }
    Ok(())
}

fn read_len(src: &mut impl Buf) -> Result<usize, ProtocolError> {
    let len = read_i32(src)?;
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

/// Writes a little-endian `i32`.
pub fn write_i32(dst: &mut impl BufMut, value: i32) {
    dst.put_i32_le(value);
}

/// Reads a little-endian `i32`.
pub fn read_i32(src: &mut impl Buf) -> Result<i32, ProtocolError> {
    ensure(src.remaining(), LEN_PREFIX)?;
    Ok(src.get_i32_le())
}

/// Converts a byte length or item count to its `i32` prefix, or `None`
/// if it does not fit.
fn wire_len(len: usize) -> Option<i32> {
    i32::try_from(len).ok()
}

/// Writes a length-prefixed UTF-8 string.
///
/// A string longer than `i32::MAX` bytes has no wire representation. It is
/// logged and written as the empty string so the rest of the frame stays
/// readable.
pub fn write_string(dst: &mut impl BufMut, value: &str) {
    let Some(len) = wire_len(value.len()) else {
        tracing::error!(len = value.len(), "string too long for the wire, sending empty");
        write_i32(dst, 0);
        return;
    };
    write_i32(dst, len);
    dst.put_slice(value.as_bytes());
}

/// Reads a length-prefixed UTF-8 string.
pub fn read_string(src: &mut impl Buf) -> Result<String, ProtocolError> {
    let len = read_len(src)?;
    ensure(src.remaining(), len)?;
    let raw = src.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Writes a count-prefixed list of strings. A list longer than
/// `i32::MAX` items is logged and written empty.
pub fn write_string_list(dst: &mut impl BufMut, values: &[String]) {
    let Some(count) = wire_len(values.len()) else {
        tracing::error!(count = values.len(), "list too long for the wire, sending empty");
        write_i32(dst, 0);
        return;
    };
    write_i32(dst, count);
    for value in values {
        write_string(dst, value);
    }
}

/// Reads a count-prefixed list of strings.
pub fn read_string_list(
    src: &mut impl Buf,
) -> Result<Vec<String>, ProtocolError> {
    let count = read_len(src)?;
    // Each string needs at least its 4-byte prefix, which bounds the
    // allocation a hostile count can trigger.
    let mut values =
        Vec::with_capacity(count.min(src.remaining() / LEN_PREFIX));
    for _ in 0..count {
        values.push(read_string(src)?);
    }
    Ok(values)
}

/// Encodes `packet` into a complete frame tagged with `id`.
pub fn encode_frame(id: PacketId, packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(PACKET_ID_LEN + 16);
    write_i32(&mut buf, id.into_inner());
    packet.encode_body(&mut buf);
    buf.freeze()
}

/// Reads the leading packet id of a frame, advancing past it.
pub fn read_packet_id(src: &mut impl Buf) -> Result<PacketId, ProtocolError> {
    read_i32(src).map(PacketId::new)
}
