//! The session manager: tracks all live client sessions.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself; it uses a plain
//! `HashMap`. The server wraps it in a mutex and only holds that lock
//! for single insert/remove/lookup calls.

use std::collections::HashMap;
use std::sync::Arc;

use roomlink_transport::ConnectionId;

use crate::{Session, SessionError};

/// Table of every connected client, keyed by connection id.
///
/// ## Lifecycle
///
/// ```text
/// transport accept ──→ connect() ──→ [live] ──→ disconnect() ──→ gone
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Arc<Session>>,
}

impl SessionManager {
    /// Creates an empty session table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted session.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if a session with the
    /// same id is already live. The existing session is kept.
    pub fn connect(
        &mut self,
        session: Arc<Session>,
    ) -> Result<Arc<Session>, SessionError> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyConnected(id));
        }
        self.sessions.insert(id, Arc::clone(&session));
        tracing::info!(conn_id = %id, live = self.sessions.len(), "session created");
        Ok(session)
    }

    /// Removes a session and hands it back so the caller can run room
    /// teardown with it.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(
        &mut self,
        id: ConnectionId,
    ) -> Result<Arc<Session>, SessionError> {
        let session =
            self.sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        tracing::info!(conn_id = %id, live = self.sessions.len(), "session removed");
        Ok(session)
    }

    /// Looks up a session by connection id.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).cloned()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
