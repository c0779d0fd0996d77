//! Error types for the protocol layer.
//!
//! Each crate in Roomlink defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were wrong: the transport delivered
//! them fine, but they don't form a valid packet.

use crate::PacketKind;

/// Errors that can occur while decoding packets.
///
/// Encoding never fails: every packet value has a wire representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended before a field was complete.
    #[error("truncated packet: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the field required.
        needed: usize,
        /// Bytes that were actually left in the buffer.
        remaining: usize,
    },

    /// A length or count prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A handler registered for one kind was handed a packet of another.
    ///
    /// Only reachable through a bug in the dispatcher wiring.
    #[error("expected a {expected} packet, got {actual}")]
    KindMismatch {
        /// The kind the handler was registered for.
        expected: PacketKind,
        /// The kind that actually arrived.
        actual: PacketKind,
    },
}
