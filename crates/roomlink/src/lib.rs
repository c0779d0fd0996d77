//! # Roomlink
//!
//! Ad-hoc multiplayer lobbies: one client hosts a room, others join it by
//! typing a short code, and everyone in the room is kept up to date on
//! who is there.
//!
//! The workspace is layered:
//!
//! ```text
//! roomlink            ← Server, Client, config, binaries (this crate)
//! roomlink-room       ← Room, RoomTable, SyncList
//! roomlink-session    ← Session, SessionManager
//! roomlink-protocol   ← packets, codec, registry, dispatcher
//! roomlink-transport  ← Transport/Connection traits, WebSocket
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), roomlink::RoomlinkError> {
//! let server = roomlink::RoomlinkServer::builder()
//!     .bind("127.0.0.1:29563")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
pub mod config;
mod connection;
mod error;
mod handlers;
mod server;

pub use client::{Client, Lobby, LobbyEvent};
pub use config::{CliArgs, ClientAction, Config, ConfigError};
pub use error::RoomlinkError;
pub use handlers::server_dispatcher;
pub use server::{RoomlinkServer, RoomlinkServerBuilder, Server};

/// Installs the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (e.g. in tests) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
