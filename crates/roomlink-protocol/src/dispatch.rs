//! Routes decoded packets to the function registered for their kind.
//!
//! A dispatcher is built once at startup from an explicit table of
//! `register` calls and is read-only afterwards. Handlers are plain `fn`
//! items, so a handler whose signature does not match its packet type is
//! a compile error rather than a runtime surprise.
//!
//! ```rust
//! use roomlink_protocol::{Dispatcher, HandlerResult, Heartbeat, Packet};
//!
//! struct Counter(std::sync::atomic::AtomicU32);
//!
//! fn on_heartbeat(counter: &Counter, _conn: &u64, _packet: Heartbeat) -> HandlerResult {
//!     counter.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!     Ok(())
//! }
//!
//! let mut dispatcher = Dispatcher::<Counter, u64>::server();
//! dispatcher.register(on_heartbeat);
//!
//! let counter = Counter(Default::default());
//! let outcome = dispatcher.dispatch(&counter, &7, Packet::from(Heartbeat));
//! assert!(matches!(outcome, Some(Ok(()))));
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::{Packet, PacketBody, PacketKind, ProtocolError};

/// What a handler returns. Errors are logged by the receive boundary and
/// never close the connection.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type ErasedHandler<S, C> =
    Box<dyn Fn(&S, &C, Packet) -> HandlerResult + Send + Sync>;

/// Which side of the connection a dispatcher serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Handlers receive the state and the originating connection.
    Server,
    /// Handlers receive the state only.
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Maps each packet kind to at most one handler.
///
/// - `S` is the shared state handlers operate on (the server, or the
///   client's lobby mirror).
/// - `C` is the originating connection for server handlers; client
///   dispatchers use `()`.
pub struct Dispatcher<S, C = ()> {
    role: Role,
    handlers: HashMap<PacketKind, ErasedHandler<S, C>>,
}

impl<S: 'static, C: 'static> Dispatcher<S, C> {
    /// Creates an empty server-role dispatcher.
    pub fn server() -> Self {
        Self::with_role(Role::Server)
    }

    fn with_role(role: Role) -> Self {
        Self {
            role,
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for packets of type `P`.
    ///
    /// The first registration for a kind wins; later ones are ignored.
    pub fn register<P: PacketBody>(
        &mut self,
        handler: fn(&S, &C, P) -> HandlerResult,
    ) -> &mut Self {
        self.insert(
            P::KIND,
            Box::new(move |state, conn, packet| {
                handler(state, conn, narrow::<P>(packet)?)
            }),
        );
        self
    }

    fn insert(&mut self, kind: PacketKind, handler: ErasedHandler<S, C>) {
        if self.handlers.contains_key(&kind) {
            tracing::debug!(
                role = %self.role,
                %kind,
                "handler already registered, keeping the first"
            );
            return;
        }
        self.handlers.insert(kind, handler);
    }

    /// Invokes the handler registered for `packet`'s kind.
    ///
    /// Returns `None` if no handler is registered; the packet is dropped.
    /// Handler errors are returned untouched for the caller to report.
    pub fn dispatch(
        &self,
        state: &S,
        conn: &C,
        packet: Packet,
    ) -> Option<HandlerResult> {
        let handler = self.handlers.get(&packet.kind())?;
        Some(handler(state, conn, packet))
    }

    /// Returns `true` if a handler is registered for `kind`.
    pub fn handles(&self, kind: PacketKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// The role this dispatcher was built for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S: 'static> Dispatcher<S, ()> {
    /// Creates an empty client-role dispatcher.
    pub fn client() -> Self {
        Self::with_role(Role::Client)
    }

    /// Registers a client-role `handler` for packets of type `P`.
    ///
    /// Same first-wins rule as [`register`](Self::register).
    pub fn register_client<P: PacketBody>(
        &mut self,
        handler: fn(&S, P) -> HandlerResult,
    ) -> &mut Self {
        self.insert(
            P::KIND,
            Box::new(move |state, _conn: &(), packet| {
                handler(state, narrow::<P>(packet)?)
            }),
        );
        self
    }
}

impl<S, C> fmt::Debug for Dispatcher<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("role", &self.role)
            .field("handles", &kinds)
            .finish()
    }
}

fn narrow<P: PacketBody>(packet: Packet) -> Result<P, ProtocolError> {
    P::try_from(packet).map_err(|other| ProtocolError::KindMismatch {
        expected: P::KIND,
        actual: other.kind(),
    })
}
