//! Room management for Roomlink.
//!
//! A room is a host plus an ordered list of guest members, named by a
//! short code players type to join. All state lives behind short-lived
//! locks so the synchronous packet handlers of many connections can
//! operate on it at once.
//!
//! # Key types
//!
//! - [`RoomTable`]: the server's set of live rooms; create, join,
//!   destroy, and disconnect handling
//! - [`Room`]: one room: membership and broadcast
//! - [`SyncList`]: the locked list both of the above are built on
//! - [`RoomState`]: lifecycle state machine

mod error;
mod list;
mod room;
mod state;
mod table;

pub use error::RoomError;
pub use list::SyncList;
pub use room::Room;
pub use state::RoomState;
pub use table::{Departure, DestroyCause, RoomTable, generate_code};
