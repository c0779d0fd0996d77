//! The packet registry: a bijection between packet kinds and wire ids.
//!
//! Both peers build a registry at startup by registering the same kinds in
//! the same order, which makes them agree on ids without ever exchanging
//! them. After startup the registry is shared read-only (usually behind an
//! `Arc`), so lookups need no locking.

use std::collections::HashMap;

use crate::{Packet, PacketBody, PacketId, PacketKind};

/// Registration order of the full catalog.
///
/// Changing this order changes every id after the edit point, so clients
/// and servers built from different orders cannot talk to each other.
pub const CATALOG: &[PacketKind] = &[
    PacketKind::Heartbeat,
    PacketKind::RequestRoomHost,
    PacketKind::RequestRoomJoin,
    PacketKind::RoomCreated,
    PacketKind::RoomJoined,
    PacketKind::RoomPlayerListUpdated,
    PacketKind::RoomError,
    PacketKind::RoomDestroyed,
    PacketKind::SendName,
    PacketKind::RequestRoomDestroy,
];

/// Maps packet kinds to ids and back.
///
/// ## Invariants
///
/// - Ids start at 1 and increase by one per newly registered kind.
/// - A kind never receives a second id.
/// - Kinds that were never registered can be neither sent nor received.
#[derive(Debug, Default)]
pub struct PacketRegistry {
    by_kind: HashMap<PacketKind, PacketId>,
    by_id: HashMap<PacketId, PacketKind>,
    last_id: i32,
}

impl PacketRegistry {
    /// Creates an empty registry. Nothing can be sent until kinds are
    /// registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the whole [`CATALOG`] registered.
    pub fn with_catalog() -> Self {
        let mut registry = Self::new();
        registry.initialize();
        registry
    }

    /// Registers every kind of the [`CATALOG`], in order.
    ///
    /// Safe to call more than once: kinds that are already registered
    /// keep their ids.
    pub fn initialize(&mut self) {
        for &kind in CATALOG {
            self.register(kind);
        }
    }

    /// Registers `kind` and returns its id.
    ///
    /// If `kind` is already registered this is a no-op that returns the
    /// existing id.
    pub fn register(&mut self, kind: PacketKind) -> PacketId {
        if let Some(&id) = self.by_kind.get(&kind) {
            return id;
        }
        self.last_id += 1;
        let id = PacketId::new(self.last_id);
        self.by_kind.insert(kind, id);
        self.by_id.insert(id, kind);
        tracing::debug!(%kind, %id, "packet registered");
        id
    }

    /// Registers the packet type `P`. See [`register`](Self::register).
    pub fn register_body<P: PacketBody>(&mut self) -> PacketId {
        self.register(P::KIND)
    }

    /// Returns the id of `kind`, or `None` if it was never registered.
    pub fn id_of(&self, kind: PacketKind) -> Option<PacketId> {
        self.by_kind.get(&kind).copied()
    }

    /// Returns the kind registered under `id`, if any.
    pub fn kind_of(&self, id: PacketId) -> Option<PacketKind> {
        self.by_id.get(&id).copied()
    }

    /// Returns a blank packet of the kind registered under `id`, ready for
    /// [`Packet::decode_into`]. `None` if the id is unknown.
    pub fn create(&self, id: PacketId) -> Option<Packet> {
        self.kind_of(id).map(PacketKind::blank)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
