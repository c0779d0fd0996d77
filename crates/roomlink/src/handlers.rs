//! Server-side packet handlers.
//!
//! Each function handles one client-to-server packet kind. The table in
//! [`server_dispatcher`] is the single place that wires them up; a
//! handler with the wrong signature for its packet fails to compile.

use std::sync::Arc;

use roomlink_protocol::{
    Dispatcher, HandlerResult, Heartbeat, RequestRoomDestroy, RequestRoomHost,
    RequestRoomJoin, SendName,
};
use roomlink_session::Session;

use crate::Server;

/// Builds the server's handler table.
///
/// Server-to-client kinds (`RoomCreated`, `RoomError`, ...) have no entry;
/// a client sending one gets it dropped and logged.
pub fn server_dispatcher() -> Dispatcher<Server, Arc<Session>> {
    let mut dispatcher = Dispatcher::server();
    dispatcher
        .register(on_heartbeat)
        .register(on_request_room_host)
        .register(on_request_room_join)
        .register(on_send_name)
        .register(on_request_room_destroy);
    dispatcher
}

fn on_heartbeat(
    _server: &Server,
    session: &Arc<Session>,
    _packet: Heartbeat,
) -> HandlerResult {
    tracing::trace!(conn_id = %session.id(), "heartbeat");
    Ok(())
}

fn on_request_room_host(
    server: &Server,
    session: &Arc<Session>,
    _packet: RequestRoomHost,
) -> HandlerResult {
    server.create_room(session);
    Ok(())
}

fn on_request_room_join(
    server: &Server,
    session: &Arc<Session>,
    packet: RequestRoomJoin,
) -> HandlerResult {
    server.join_room(session, &packet.room_code);
    Ok(())
}

fn on_send_name(
    server: &Server,
    session: &Arc<Session>,
    packet: SendName,
) -> HandlerResult {
    server.rename(session, packet.name);
    Ok(())
}

fn on_request_room_destroy(
    server: &Server,
    session: &Arc<Session>,
    _packet: RequestRoomDestroy,
) -> HandlerResult {
    server.destroy_room(session);
    Ok(())
}
