//! The two ends of a packet connection: sending typed packets and
//! turning received frames into handler calls.
//!
//! Both roles share this code. A server session and a client link each
//! implement [`PacketSink`] over whatever actually carries their bytes,
//! and both feed inbound frames through [`receive`].

use std::panic::{self, AssertUnwindSafe};

use bytes::{Buf, Bytes};
use roomlink_transport::{ConnectionId, TransportError};

use crate::codec::{encode_frame, read_packet_id};
use crate::{Dispatcher, Packet, PacketId, PacketKind, PacketRegistry};

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// Something typed packets can be sent through.
///
/// Implementors supply the registry and a way to write one finished
/// frame; [`send_packet`](PacketSink::send_packet) does the rest.
pub trait PacketSink {
    /// The registry that assigns ids to outgoing packets.
    fn registry(&self) -> &PacketRegistry;

    /// Hands one complete frame to the underlying carrier.
    fn write_frame(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Identity used in log lines, if the sink has one.
    fn connection_id(&self) -> Option<ConnectionId> {
        None
    }

    /// Encodes `packet` and writes it as a single frame.
    ///
    /// A packet whose kind was never registered is not sent; the problem
    /// is logged and the call returns normally. Write failures are logged
    /// too: a send never fails the caller.
    fn send_packet(&self, packet: impl Into<Packet>) {
        let packet = packet.into();
        let kind = packet.kind();
        let Some(id) = self.registry().id_of(kind) else {
            tracing::warn!(
                conn = ?self.connection_id(),
                %kind,
                "refusing to send unregistered packet"
            );
            return;
        };

        let frame = encode_frame(id, &packet);
        let len = frame.len();
        match self.write_frame(frame) {
            Ok(()) => {
                tracing::trace!(conn = ?self.connection_id(), %kind, %id, len, "packet sent");
            }
            Err(e) => {
                tracing::error!(
                    conn = ?self.connection_id(),
                    %kind,
                    error = %e,
                    "failed to send packet"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Receiving
// ---------------------------------------------------------------------------

/// What became of one inbound frame.
///
/// Every variant other than `Handled` has already been logged by
/// [`receive`]; callers use it for bookkeeping and tests. None of them
/// closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// The handler ran and returned `Ok`.
    Handled(PacketKind),
    /// The packet decoded but no handler is registered for its kind.
    Unhandled(PacketKind),
    /// The frame's id is not in the registry.
    Unregistered(PacketId),
    /// The frame was too short for an id, or the body failed to decode.
    Malformed,
    /// The handler returned an error or panicked.
    HandlerFailed(PacketKind),
}

/// Decodes one frame and dispatches it.
///
/// Trailing bytes after a fully decoded body are ignored. A handler
/// that panics is contained here so one bad packet cannot take down the
/// connection task.
pub fn receive<S: 'static, C: 'static>(
    registry: &PacketRegistry,
    dispatcher: &Dispatcher<S, C>,
    state: &S,
    conn: &C,
    frame: &[u8],
) -> Receipt {
    let mut src = frame;

    let id = match read_packet_id(&mut src) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(len = frame.len(), error = %e, "frame too short for a packet id");
            return Receipt::Malformed;
        }
    };

    let Some(mut packet) = registry.create(id) else {
        tracing::warn!(%id, "received unregistered packet id");
        return Receipt::Unregistered(id);
    };
    let kind = packet.kind();

    if let Err(e) = packet.decode_into(&mut src) {
        tracing::error!(%kind, %id, error = %e, "failed to decode packet body");
        return Receipt::Malformed;
    }
    if src.has_remaining() {
        tracing::trace!(%kind, trailing = src.remaining(), "ignoring trailing bytes");
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.dispatch(state, conn, packet)
    }));

    match outcome {
        Ok(Some(Ok(()))) => {
            tracing::trace!(%kind, "packet handled");
            Receipt::Handled(kind)
        }
        Ok(Some(Err(e))) => {
            tracing::error!(%kind, error = %e, "packet handler failed");
            Receipt::HandlerFailed(kind)
        }
        Ok(None) => {
            tracing::debug!(role = %dispatcher.role(), %kind, "no handler registered, dropping packet");
            Receipt::Unhandled(kind)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%kind, panic = %message, "packet handler panicked");
            Receipt::HandlerFailed(kind)
        }
    }
}
