//! Integration tests for rooms and the room table, driven through real
//! sessions whose outbound queues are inspected directly.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use roomlink_protocol::{
    Packet, PacketRegistry, RoomCode, RoomCreated, RoomDestroyed, RoomJoined,
    RoomPlayerListUpdated, read_packet_id,
};
use roomlink_room::{Departure, DestroyCause, RoomError, RoomState, RoomTable};
use roomlink_session::Session;
use roomlink_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

/// A session plus the far end of its outbound queue.
struct Peer {
    session: Arc<Session>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    registry: Arc<PacketRegistry>,
}

impl Peer {
    fn new(id: u64, name: &str) -> Self {
        let registry = Arc::new(PacketRegistry::with_catalog());
        let (session, rx) =
            Session::channel(ConnectionId::new(id), Arc::clone(&registry));
        session.set_name(name);
        Self {
            session: Arc::new(session),
            rx,
            registry,
        }
    }

    /// Decodes every frame queued so far.
    fn inbox(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            let mut src = &frame[..];
            let id = read_packet_id(&mut src).unwrap();
            let mut packet = self.registry.create(id).unwrap();
            packet.decode_into(&mut src).unwrap();
            packets.push(packet);
        }
        packets
    }
}

fn roster(names: &[&str]) -> Packet {
    RoomPlayerListUpdated {
        players: names.iter().map(|n| n.to_string()).collect(),
    }
    .into()
}

// =========================================================================
// Creating rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_informs_host_of_code() {
    let table = RoomTable::new();
    let mut host = Peer::new(1, "host");

    let room = table.create(&host.session).unwrap();

    assert!(room.code().is_well_formed());
    assert_eq!(room.state(), RoomState::Created);
    assert_eq!(host.session.current_room().as_ref(), Some(room.code()));
    assert_eq!(
        host.inbox(),
        vec![Packet::from(RoomCreated {
            room_code: room.code().clone()
        })]
    );
    assert_eq!(table.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_yield_distinct_codes() {
    let table = Arc::new(RoomTable::new());
    let mut tasks = Vec::new();
    for i in 0..64 {
        let table = Arc::clone(&table);
        tasks.push(tokio::spawn(async move {
            let host = Peer::new(i, "h");
            table.create(&host.session).unwrap().code().clone()
        }));
    }

    let mut codes = HashSet::new();
    for task in tasks {
        let code = task.await.unwrap();
        assert!(code.is_well_formed(), "bad code {code}");
        codes.insert(code);
    }
    assert_eq!(codes.len(), 64);
    assert_eq!(table.len(), 64);
}

#[tokio::test]
async fn test_host_cannot_create_second_room() {
    let table = RoomTable::new();
    let host = Peer::new(1, "host");
    let first = table.create(&host.session).unwrap();

    let result = table.create(&host.session);
    assert!(matches!(result, Err(RoomError::AlreadyInRoom(_, ref code)) if code == first.code()));
    assert_eq!(table.len(), 1);
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_sends_joined_then_roster_to_everyone() {
    let table = RoomTable::new();
    let mut host = Peer::new(1, "host");
    let mut bob = Peer::new(2, "bob");
    let room = table.create(&host.session).unwrap();
    host.inbox();

    table.join(&bob.session, room.code()).unwrap();

    assert_eq!(bob.inbox(), vec![Packet::from(RoomJoined), roster(&["bob"])]);
    assert_eq!(host.inbox(), vec![roster(&["bob"])]);
    assert_eq!(bob.session.current_room().as_ref(), Some(room.code()));
    assert_eq!(room.state(), RoomState::Active);
}

#[tokio::test]
async fn test_join_normalizes_typed_code() {
    let table = RoomTable::new();
    let host = Peer::new(1, "host");
    let bob = Peer::new(2, "bob");
    let room = table.create(&host.session).unwrap();

    let typed = RoomCode::new(format!("  {}\n", room.code().as_str().to_lowercase()));
    let joined = table.join(&bob.session, &typed).unwrap();
    assert_eq!(joined.code(), room.code());
}

#[tokio::test]
async fn test_join_missing_room_mutates_nothing() {
    let table = RoomTable::new();
    let host = Peer::new(1, "host");
    let mut bob = Peer::new(2, "bob");
    let room = table.create(&host.session).unwrap();

    let result = table.join(&bob.session, &RoomCode::new("ZZZZZ"));
    // A generated code could in principle be ZZZZZ.
    if room.code().as_str() != "ZZZZZ" {
        assert_eq!(result.unwrap_err(), RoomError::NotFound(RoomCode::new("ZZZZZ")));
        assert!(bob.inbox().is_empty());
        assert_eq!(bob.session.current_room(), None);
        assert!(room.members().is_empty());
        assert_eq!(table.len(), 1);
    }
}

#[tokio::test]
async fn test_member_cannot_join_second_room() {
    let table = RoomTable::new();
    let h1 = Peer::new(1, "h1");
    let h2 = Peer::new(2, "h2");
    let bob = Peer::new(3, "bob");
    let r1 = table.create(&h1.session).unwrap();
    let r2 = table.create(&h2.session).unwrap();

    table.join(&bob.session, r1.code()).unwrap();
    let result = table.join(&bob.session, r2.code());

    assert!(matches!(result, Err(RoomError::AlreadyInRoom(..))));
    assert!(r2.members().is_empty());
}

#[tokio::test]
async fn test_membership_invariant_over_mixed_operations() {
    let table = RoomTable::new();
    let hosts: Vec<_> = (1..=3).map(|i| Peer::new(i, "h")).collect();
    let guests: Vec<_> = (10..16).map(|i| Peer::new(i, "g")).collect();
    let rooms: Vec<_> = hosts
        .iter()
        .map(|h| table.create(&h.session).unwrap())
        .collect();

    for (i, guest) in guests.iter().enumerate() {
        // Everyone tries every room; only the first attempt may succeed.
        for offset in 0..rooms.len() {
            let _ = table.join(&guest.session, rooms[(i + offset) % rooms.len()].code());
        }
        if i % 2 == 0 {
            table.depart(&guest.session);
        }
    }

    for guest in &guests {
        let rooms_containing: usize = rooms
            .iter()
            .map(|room| {
                let as_member = room
                    .members()
                    .iter()
                    .filter(|m| m.id() == guest.session.id())
                    .count();
                as_member + usize::from(room.is_host(&guest.session))
            })
            .sum();
        assert!(rooms_containing <= 1);
        assert_eq!(
            rooms_containing == 1,
            guest.session.current_room().is_some()
        );
    }
}

// =========================================================================
// Leaving and teardown
// =========================================================================

#[tokio::test]
async fn test_host_disconnect_destroys_room_and_notifies_members_only() {
    let table = RoomTable::new();
    let mut host = Peer::new(1, "host");
    let mut a = Peer::new(2, "a");
    let mut b = Peer::new(3, "b");
    let room = table.create(&host.session).unwrap();
    table.join(&a.session, room.code()).unwrap();
    table.join(&b.session, room.code()).unwrap();
    host.inbox();
    a.inbox();
    b.inbox();

    let departure = table.depart(&host.session);

    assert_eq!(departure, Departure::Destroyed(room.code().clone()));
    assert!(table.get(room.code()).is_none());
    assert_eq!(room.state(), RoomState::Destroyed);
    assert_eq!(a.inbox(), vec![Packet::from(RoomDestroyed)]);
    assert_eq!(b.inbox(), vec![Packet::from(RoomDestroyed)]);
    assert!(host.inbox().is_empty());
    assert_eq!(a.session.current_room(), None);
    assert_eq!(b.session.current_room(), None);
}

#[tokio::test]
async fn test_member_disconnect_keeps_room_and_rebroadcasts_roster() {
    let table = RoomTable::new();
    let mut host = Peer::new(1, "host");
    let a = Peer::new(2, "a");
    let mut b = Peer::new(3, "b");
    let room = table.create(&host.session).unwrap();
    table.join(&a.session, room.code()).unwrap();
    table.join(&b.session, room.code()).unwrap();
    host.inbox();
    b.inbox();

    let departure = table.depart(&a.session);

    assert_eq!(departure, Departure::Left(room.code().clone()));
    assert!(table.get(room.code()).is_some());
    assert_eq!(host.inbox(), vec![roster(&["b"])]);
    assert_eq!(b.inbox(), vec![roster(&["b"])]);
    assert_eq!(a.session.current_room(), None);
}

#[tokio::test]
async fn test_depart_without_room_does_nothing() {
    let table = RoomTable::new();
    let loner = Peer::new(1, "loner");
    assert_eq!(table.depart(&loner.session), Departure::NoRoom);
}

#[tokio::test]
async fn test_host_request_destroy_notifies_host_too() {
    let table = RoomTable::new();
    let mut host = Peer::new(1, "host");
    let mut a = Peer::new(2, "a");
    let room = table.create(&host.session).unwrap();
    table.join(&a.session, room.code()).unwrap();
    host.inbox();
    a.inbox();

    let code = table.destroy_by(&host.session).unwrap();

    assert_eq!(&code, room.code());
    assert!(table.is_empty());
    assert_eq!(host.inbox(), vec![Packet::from(RoomDestroyed)]);
    assert_eq!(a.inbox(), vec![Packet::from(RoomDestroyed)]);
    assert_eq!(host.session.current_room(), None);

    // Both may host or join again afterwards.
    assert!(table.create(&a.session).is_ok());
}

#[tokio::test]
async fn test_destroy_request_from_member_is_refused() {
    let table = RoomTable::new();
    let host = Peer::new(1, "host");
    let a = Peer::new(2, "a");
    let room = table.create(&host.session).unwrap();
    table.join(&a.session, room.code()).unwrap();

    let result = table.destroy_by(&a.session);

    assert!(matches!(result, Err(RoomError::NotHost(..))));
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn test_destroy_request_outside_room_is_refused() {
    let table = RoomTable::new();
    let loner = Peer::new(1, "loner");
    let result = table.destroy_by(&loner.session);
    assert!(matches!(result, Err(RoomError::NotInRoom(_))));
}

#[tokio::test]
async fn test_join_destroyed_room_fails() {
    let table = RoomTable::new();
    let host = Peer::new(1, "host");
    let bob = Peer::new(2, "bob");
    let room = table.create(&host.session).unwrap();
    table.destroy(room.code(), DestroyCause::HostRequest).unwrap();

    let result = table.join(&bob.session, room.code());
    assert!(matches!(result, Err(RoomError::NotFound(_))));
    assert_eq!(bob.session.current_room(), None);
}

#[tokio::test]
async fn test_codes_lists_live_rooms_in_creation_order() {
    let table = RoomTable::new();
    let h1 = Peer::new(1, "h1");
    let h2 = Peer::new(2, "h2");
    let r1 = table.create(&h1.session).unwrap();
    let r2 = table.create(&h2.session).unwrap();
    assert_eq!(table.codes(), vec![r1.code().clone(), r2.code().clone()]);

    table.depart(&h1.session);
    assert_eq!(table.codes(), vec![r2.code().clone()]);
}
