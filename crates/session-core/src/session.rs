//! Server-side session record
//!
//! A [`ServerSession`] is created by the session lifecycle owner and handed to
//! the [`SessionRegistry`](crate::registry::SessionRegistry) for indexing. The
//! session's address and connection are derived fields: only the registry
//! writes them, which is why their setters are crate-private.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::connection::{same_connection, Connection, ConnectionRef};
use crate::types::{ClientId, NetworkAddress, SessionId};

/// Lifecycle state of a session as reported by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Session is open and keep-alives are current
    Open,
    /// Keep-alives have been missed but the session has not yet expired
    Unstable,
    /// Session timed out
    Expired,
    /// Session was closed explicitly by the client
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Open => "open",
            SessionState::Unstable => "unstable",
            SessionState::Expired => "expired",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An active, server-visible client session
pub struct ServerSession {
    id: SessionId,
    client: ClientId,
    created_at: DateTime<Utc>,
    state: RwLock<SessionState>,
    address: RwLock<Option<NetworkAddress>>,
    connection: RwLock<Option<ConnectionRef>>,
}

impl ServerSession {
    /// Create an open session with no address or connection yet
    pub fn new(id: SessionId, client: ClientId) -> Self {
        Self {
            id,
            client,
            created_at: Utc::now(),
            state: RwLock::new(SessionState::Open),
            address: RwLock::new(None),
            connection: RwLock::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Client identity that owns this session
    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Update the lifecycle state.
    ///
    /// The registry never calls this; state belongs to the lifecycle owner.
    pub fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Whether the session can still receive responses
    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Open | SessionState::Unstable)
    }

    /// Most recently bound address of the owning client
    pub fn address(&self) -> Option<NetworkAddress> {
        self.address.read().clone()
    }

    /// Current connection of the owning client
    pub fn connection(&self) -> Option<ConnectionRef> {
        self.connection.read().clone()
    }

    pub(crate) fn set_address(&self, address: Option<NetworkAddress>) {
        *self.address.write() = address;
    }

    pub(crate) fn set_connection(&self, connection: Option<ConnectionRef>) {
        *self.connection.write() = connection;
    }

    /// Clear the connection only if it is still `connection`.
    ///
    /// Returns true if the field was cleared.
    pub(crate) fn clear_connection_if(&self, connection: &dyn Connection) -> bool {
        let mut current = self.connection.write();
        let matches = current
            .as_deref()
            .map_or(false, |existing| same_connection(existing, connection));
        if matches {
            *current = None;
        }
        matches
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("state", &self.state())
            .field("address", &self.address())
            .field("connection", &self.connection().map(|c| c.id()))
            .finish()
    }
}

impl fmt::Display for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session[id={}, client={}, state={}]", self.id, self.client, self.state())
    }
}
