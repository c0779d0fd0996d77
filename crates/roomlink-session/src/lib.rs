//! Client sessions for the Roomlink server.
//!
//! A [`Session`] is the server's record of one accepted connection: who
//! it is, what it calls itself, which room it is in, and where its
//! outbound packets go. The [`SessionManager`] is the table of every
//! live session.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)      ← groups sessions into rooms and broadcasts to them
//!     ↕
//! Session Layer (this crate)  ← connection identity, name, room slot, outbound queue
//!     ↕
//! Protocol Layer (below)  ← PacketSink, PacketRegistry, RoomCode
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::Session;
