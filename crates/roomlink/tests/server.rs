//! End-to-end tests: a real server on a random port, driven by `Client`s
//! and by raw WebSocket peers speaking the wire format directly.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomlink::{Client, LobbyEvent, RoomlinkServer, Server};
use roomlink_protocol::{
    Packet, PacketRegistry, RequestRoomHost, RoomCode, RoomCreated, RoomErrorCode,
    encode_frame, read_packet_id,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

/// Starts a server on a random port and returns its address and state.
async fn start_server() -> (String, Arc<Server>) {
    let server = RoomlinkServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let state = Arc::clone(server.server());

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, state)
}

fn registry() -> Arc<PacketRegistry> {
    Arc::new(PacketRegistry::with_catalog())
}

async fn connect(addr: &str) -> (Client, UnboundedReceiver<LobbyEvent>) {
    Client::connect(addr, registry())
        .await
        .expect("should connect")
}

async fn next_event(events: &mut UnboundedReceiver<LobbyEvent>) -> LobbyEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream ended")
}

/// Hosts a room and returns its code.
async fn host(client: &Client, events: &mut UnboundedReceiver<LobbyEvent>) -> RoomCode {
    client.host_room();
    match next_event(events).await {
        LobbyEvent::RoomCreated(code) => code,
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

async fn raw_connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

fn raw_frame(packet: impl Into<Packet>) -> Message {
    let packet = packet.into();
    let id = registry().id_of(packet.kind()).expect("catalog kind");
    Message::Binary(encode_frame(id, &packet))
}

async fn raw_recv(ws: &mut ClientWs) -> Packet {
    let msg = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("recv");
    let data = msg.into_data();
    let mut src = &data[..];
    let id = read_packet_id(&mut src).expect("packet id");
    let mut packet = registry().create(id).expect("known id");
    packet.decode_into(&mut src).expect("decode");
    packet
}

// =========================================================================
// Lobby flow
// =========================================================================

#[tokio::test]
async fn test_host_receives_well_formed_code() {
    let (addr, state) = start_server().await;
    let (alice, mut events) = connect(&addr).await;

    let code = host(&alice, &mut events).await;

    assert!(code.is_well_formed(), "bad code {code}");
    assert_eq!(alice.lobby().room, Some(code.clone()));
    assert!(state.rooms().get(&code).is_some());
}

#[tokio::test]
async fn test_join_delivers_joined_and_roster_to_both() {
    let (addr, _state) = start_server().await;
    let (alice, mut alice_events) = connect(&addr).await;
    let (bob, mut bob_events) = connect(&addr).await;
    let code = host(&alice, &mut alice_events).await;

    bob.set_name("bob");
    bob.join_room(code.as_str().to_lowercase().as_str());

    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomJoined);
    let roster = LobbyEvent::RosterUpdated(vec!["bob".to_string()]);
    assert_eq!(next_event(&mut bob_events).await, roster);
    assert_eq!(next_event(&mut alice_events).await, roster);
    assert_eq!(alice.lobby().roster, vec!["bob".to_string()]);
    assert_eq!(bob.lobby().room, Some(code));
}

#[tokio::test]
async fn test_close_flushes_queued_requests() {
    let (addr, _state) = start_server().await;
    let (alice, mut alice_events) = connect(&addr).await;
    let (bob, _bob_events) = connect(&addr).await;
    let code = host(&alice, &mut alice_events).await;

    bob.set_name("bob");
    bob.join_room(code);
    bob.close().await;

    assert_eq!(
        next_event(&mut alice_events).await,
        LobbyEvent::RosterUpdated(vec!["bob".to_string()])
    );
    assert_eq!(
        next_event(&mut alice_events).await,
        LobbyEvent::RosterUpdated(vec![])
    );
}

#[tokio::test]
async fn test_join_unknown_code_is_refused() {
    let (addr, state) = start_server().await;
    let (bob, mut events) = connect(&addr).await;

    bob.join_room("ZZZZZ");

    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::Error(RoomErrorCode::NotExisting)
    );
    assert_eq!(bob.lobby().last_error, Some(RoomErrorCode::NotExisting));
    assert!(state.rooms().is_empty());
}

#[tokio::test]
async fn test_second_host_request_is_refused() {
    let (addr, state) = start_server().await;
    let (alice, mut events) = connect(&addr).await;
    host(&alice, &mut events).await;

    alice.host_room();

    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::Error(RoomErrorCode::AlreadyInRoom)
    );
    assert_eq!(state.rooms().len(), 1);
}

#[tokio::test]
async fn test_host_disconnect_destroys_room() {
    let (addr, state) = start_server().await;
    let (alice, mut alice_events) = connect(&addr).await;
    let (bob, mut bob_events) = connect(&addr).await;
    let code = host(&alice, &mut alice_events).await;
    bob.join_room(code.clone());
    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomJoined);
    assert!(matches!(
        next_event(&mut bob_events).await,
        LobbyEvent::RosterUpdated(_)
    ));

    alice.close().await;

    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomDestroyed);
    assert!(bob.lobby().destroyed);
    assert!(state.rooms().get(&code).is_none());

    // Bob is free to host now.
    host(&bob, &mut bob_events).await;
}

#[tokio::test]
async fn test_host_destroy_request_notifies_everyone() {
    let (addr, state) = start_server().await;
    let (alice, mut alice_events) = connect(&addr).await;
    let (bob, mut bob_events) = connect(&addr).await;
    let code = host(&alice, &mut alice_events).await;
    bob.join_room(code);
    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomJoined);
    next_event(&mut bob_events).await;
    next_event(&mut alice_events).await;

    alice.destroy_room();

    assert_eq!(next_event(&mut alice_events).await, LobbyEvent::RoomDestroyed);
    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomDestroyed);
    assert!(state.rooms().is_empty());
}

#[tokio::test]
async fn test_destroy_request_from_guest_is_refused() {
    let (addr, state) = start_server().await;
    let (alice, mut alice_events) = connect(&addr).await;
    let (bob, mut bob_events) = connect(&addr).await;
    let code = host(&alice, &mut alice_events).await;
    bob.join_room(code);
    assert_eq!(next_event(&mut bob_events).await, LobbyEvent::RoomJoined);
    next_event(&mut bob_events).await;

    bob.destroy_room();

    assert_eq!(
        next_event(&mut bob_events).await,
        LobbyEvent::Error(RoomErrorCode::NotHost)
    );
    assert_eq!(state.rooms().len(), 1);
}

#[tokio::test]
async fn test_destroy_request_outside_room_is_refused() {
    let (addr, _state) = start_server().await;
    let (alice, mut events) = connect(&addr).await;

    alice.destroy_room();

    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::Error(RoomErrorCode::NotInRoom)
    );
}

// =========================================================================
// Wire robustness
// =========================================================================

#[tokio::test]
async fn test_bad_frames_do_not_drop_connection() {
    let (addr, _state) = start_server().await;
    let mut ws = raw_connect(&addr).await;

    // Unregistered id.
    ws.send(Message::Binary(999i32.to_le_bytes().to_vec().into()))
        .await
        .expect("send");
    // Too short to hold an id.
    ws.send(Message::Binary(vec![1u8, 0].into()))
        .await
        .expect("send");
    // Valid id, truncated body.
    let mut truncated = 9i32.to_le_bytes().to_vec();
    truncated.extend_from_slice(&100i32.to_le_bytes());
    truncated.extend_from_slice(b"ab");
    ws.send(Message::Binary(truncated.into()))
        .await
        .expect("send");

    ws.send(raw_frame(RequestRoomHost)).await.expect("send");

    match raw_recv(&mut ws).await {
        Packet::RoomCreated(RoomCreated { room_code }) => {
            assert!(room_code.is_well_formed());
        }
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_removes_session() {
    let (addr, state) = start_server().await;
    let mut ws = raw_connect(&addr).await;
    ws.send(raw_frame(RequestRoomHost)).await.expect("send");
    raw_recv(&mut ws).await;
    assert_eq!(state.session_count(), 1);
    assert_eq!(state.rooms().len(), 1);

    ws.close(None).await.expect("close");
    drop(ws);

    tokio::time::timeout(WAIT, async {
        while state.session_count() > 0 || !state.rooms().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("teardown did not happen");
}
