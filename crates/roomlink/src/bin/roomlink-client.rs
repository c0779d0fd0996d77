//! Roomlink command-line client.
//!
//! Connects, optionally sends a display name, then hosts or joins a room
//! and prints lobby events until the server goes away or Ctrl-C.
//!
//! ```text
//! roomlink-client --name alice host
//! roomlink-client --name bob join K7Q2M
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use roomlink::{CliArgs, Client, ClientAction, Config, LobbyEvent};
use roomlink_protocol::PacketRegistry;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut config = Config::load_or_create(&args.config_dir())?;
    config.apply_cli_overrides(&args);
    roomlink::init_tracing(config.log_filter());

    let addr = config.socket_addr()?;
    let registry = Arc::new(PacketRegistry::with_catalog());
    let (client, mut events) = Client::connect(&addr.to_string(), registry).await?;

    if let Some(ref name) = args.name {
        client.set_name(name.clone());
    }
    match args.action {
        Some(ClientAction::Host) => client.host_room(),
        Some(ClientAction::Join { ref code }) => client.join_room(code.as_str()),
        None => println!("connected to {addr}; pass `host` or `join <CODE>` to enter a room"),
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let interrupted = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(LobbyEvent::Disconnected) | None => {
                    println!("disconnected");
                    break false;
                }
                Some(event) => print_event(&event),
            },
            _ = heartbeat.tick() => client.heartbeat(),
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    if interrupted {
        client.close().await;
    }
    Ok(())
}

fn print_event(event: &LobbyEvent) {
    match event {
        LobbyEvent::RoomCreated(code) => println!("room created: {code}"),
        LobbyEvent::RoomJoined => println!("joined room"),
        LobbyEvent::RosterUpdated(players) => println!("players: {}", players.join(", ")),
        LobbyEvent::Error(code) => println!("room error: {code}"),
        LobbyEvent::RoomDestroyed => println!("room destroyed"),
        LobbyEvent::Disconnected => println!("disconnected"),
    }
}
