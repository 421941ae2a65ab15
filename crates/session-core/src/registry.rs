//! Session Registry
//!
//! Authoritative directory mapping session IDs and client identities to
//! sessions, and client identities to their most recent address and
//! connection. Other node components resolve "where do I send a response for
//! this session" through here instead of tracking connection churn
//! themselves.
//!
//! # Consistency
//!
//! The registry is built from four independent concurrent maps:
//!
//! - session ID → session
//! - client ID → session
//! - client ID → address
//! - client ID → connection
//!
//! Each single-key operation is linearizable and operations on the same key
//! observe last-writer-wins ordering. Operations spanning several maps
//! (`register_session`, `unregister_session`, the binding calls) are **not**
//! atomic as a whole. A `register_address` racing with `register_session`
//! for the same client may leave the session briefly holding the previous
//! address until the next binding. Callers needing a stronger guarantee must
//! serialize those calls themselves.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::RegistryConfig;
use crate::connection::{same_connection, Connection, ConnectionRef};
use crate::error::{RegistryError, Result};
use crate::listener::{ListenerSet, SessionListener};
use crate::session::ServerSession;
use crate::types::{ClientId, NetworkAddress, SessionId};

/// Read-only view of the registry for request routers and the state machine
pub trait SessionDirectory: Send + Sync {
    /// Look up a session by its ID
    fn session(&self, id: SessionId) -> Option<Arc<ServerSession>>;

    /// Look up the session currently indexed for a client
    fn session_for_client(&self, client: &ClientId) -> Option<Arc<ServerSession>>;

    /// Snapshot of the registered sessions
    fn sessions(&self) -> Sessions;

    /// Number of sessions indexed by ID
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Point-in-time sizes of the registry's maps.
///
/// Each count is read independently, so the numbers may not agree with each
/// other under concurrent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStats {
    pub sessions: usize,
    pub clients: usize,
    pub addresses: usize,
    pub connections: usize,
    pub listeners: usize,
}

/// Iterator over a snapshot of registered sessions.
///
/// The snapshot is taken when the iterator is created; the registry can be
/// freely mutated while it is consumed.
#[derive(Debug)]
pub struct Sessions {
    inner: std::vec::IntoIter<Arc<ServerSession>>,
}

impl Iterator for Sessions {
    type Item = Arc<ServerSession>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Sessions {}

/// Registry of sessions and their transport bindings
pub struct SessionRegistry {
    /// Sessions by session ID
    sessions: DashMap<SessionId, Arc<ServerSession>>,
    /// Most recently registered session per client
    clients: DashMap<ClientId, Arc<ServerSession>>,
    /// Last reported address per client
    addresses: DashMap<ClientId, NetworkAddress>,
    /// Current connection per client
    connections: DashMap<ClientId, ConnectionRef>,
    listeners: ListenerSet,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            clients: DashMap::new(),
            addresses: DashMap::new(),
            connections: DashMap::new(),
            listeners: ListenerSet::new(),
        }
    }

    /// Create a registry with maps sized according to `config`
    pub fn with_config(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.initial_capacity;
        let registry = match config.shard_amount {
            Some(shards) => Self {
                sessions: DashMap::with_capacity_and_shard_amount(capacity, shards),
                clients: DashMap::with_capacity_and_shard_amount(capacity, shards),
                addresses: DashMap::with_capacity_and_shard_amount(capacity, shards),
                connections: DashMap::with_capacity_and_shard_amount(capacity, shards),
                listeners: ListenerSet::new(),
            },
            None => Self {
                sessions: DashMap::with_capacity(capacity),
                clients: DashMap::with_capacity(capacity),
                addresses: DashMap::with_capacity(capacity),
                connections: DashMap::with_capacity(capacity),
                listeners: ListenerSet::new(),
            },
        };
        debug!(
            initial_capacity = capacity,
            shard_amount = ?config.shard_amount,
            "Created session registry"
        );
        Ok(registry)
    }

    /// Look up a session by its ID
    pub fn session(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Look up the session currently indexed for a client
    pub fn session_for_client(&self, client: &ClientId) -> Option<Arc<ServerSession>> {
        self.clients.get(client).map(|entry| entry.value().clone())
    }

    /// Address currently bound for a client, whether or not it has a session
    pub fn address(&self, client: &ClientId) -> Option<NetworkAddress> {
        self.addresses.get(client).map(|entry| entry.value().clone())
    }

    /// Connection currently bound for a client, whether or not it has a session
    pub fn connection(&self, client: &ClientId) -> Option<ConnectionRef> {
        self.connections.get(client).map(|entry| entry.value().clone())
    }

    /// Subscribe a listener to session lifecycle events.
    ///
    /// Fails with [`RegistryError::InvalidArgument`] if `listener` is `None`.
    pub fn add_listener(&self, listener: Option<Arc<dyn SessionListener>>) -> Result<&Self> {
        let listener = listener.ok_or(RegistryError::InvalidArgument("listener"))?;
        self.listeners.insert(listener);
        Ok(self)
    }

    /// Unsubscribe a listener.
    ///
    /// Fails with [`RegistryError::InvalidArgument`] if `listener` is `None`.
    /// Removing a listener that was never added is not an error.
    pub fn remove_listener(&self, listener: Option<Arc<dyn SessionListener>>) -> Result<&Self> {
        let listener = listener.ok_or(RegistryError::InvalidArgument("listener"))?;
        self.listeners.remove(&listener);
        Ok(self)
    }

    /// Snapshot of the subscribed listeners
    pub fn listeners(&self) -> Vec<Arc<dyn SessionListener>> {
        self.listeners.snapshot()
    }

    /// Record the address a client reported.
    ///
    /// If the client has a registered session, its address is updated too.
    pub fn register_address(&self, client: ClientId, address: NetworkAddress) -> &Self {
        trace!(%client, %address, "Binding client address");
        if let Some(session) = self.session_for_client(&client) {
            session.set_address(Some(address.clone()));
        }
        self.addresses.insert(client, address);
        self
    }

    /// Record the connection a client is currently using.
    ///
    /// If the client has a registered session, its connection is updated too.
    pub fn register_connection(&self, client: ClientId, connection: ConnectionRef) -> &Self {
        trace!(%client, connection = %connection.id(), "Binding client connection");
        if let Some(session) = self.session_for_client(&client) {
            session.set_connection(Some(connection.clone()));
        }
        self.connections.insert(client, connection);
        self
    }

    /// Drop every client binding to `connection`.
    ///
    /// Sessions of the affected clients stay registered but lose their
    /// connection. Bindings to other connections are untouched.
    pub fn unregister_connection(&self, connection: &dyn Connection) -> &Self {
        let mut unbound = Vec::new();
        self.connections.retain(|client, bound| {
            if same_connection(&**bound, connection) {
                unbound.push(*client);
                false
            } else {
                true
            }
        });

        for client in &unbound {
            if let Some(session) = self.session_for_client(client) {
                // A reconnect may already have replaced the connection.
                session.clear_connection_if(connection);
            }
        }

        if !unbound.is_empty() {
            debug!(
                connection = %connection.id(),
                clients = unbound.len(),
                "Unbound closed connection"
            );
        }
        self
    }

    /// Index a freshly created session.
    ///
    /// The client's current address and connection bindings are stamped onto
    /// the session before it becomes visible. A previous session for the same
    /// client is superseded in the client index but stays reachable by its own
    /// ID until it is unregistered. No listener is notified.
    pub fn register_session(&self, session: Arc<ServerSession>) -> Arc<ServerSession> {
        let client = session.client();
        let address = self.address(&client);
        let connection = self.connection(&client);
        session.set_address(address);
        session.set_connection(connection);

        self.sessions.insert(session.id(), session.clone());
        if let Some(previous) = self.clients.insert(client, session.clone()) {
            if previous.id() != session.id() {
                debug!(
                    %client,
                    previous = %previous.id(),
                    session_id = %session.id(),
                    "Superseded client session"
                );
            }
        }

        debug!(session_id = %session.id(), %client, "Registered session");
        session
    }

    /// Remove a session and the bindings of its client.
    ///
    /// Returns the removed session, or `None` if the ID was not registered.
    pub fn unregister_session(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        let (_, session) = self.sessions.remove(&id)?;
        let client = session.client();
        self.clients.remove(&client);
        self.addresses.remove(&client);
        self.connections.remove(&client);

        debug!(session_id = %id, %client, "Unregistered session");
        Some(session)
    }

    /// Snapshot of the registered sessions
    pub fn sessions(&self) -> Sessions {
        let snapshot: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Sessions {
            inner: snapshot.into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            sessions: self.sessions.len(),
            clients: self.clients.len(),
            addresses: self.addresses.len(),
            connections: self.connections.len(),
            listeners: self.listeners.len(),
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl SessionDirectory for SessionRegistry {
    fn session(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        SessionRegistry::session(self, id)
    }

    fn session_for_client(&self, client: &ClientId) -> Option<Arc<ServerSession>> {
        SessionRegistry::session_for_client(self, client)
    }

    fn sessions(&self) -> Sessions {
        SessionRegistry::sessions(self)
    }

    fn len(&self) -> usize {
        SessionRegistry::len(self)
    }
}

impl<'a> IntoIterator for &'a SessionRegistry {
    type Item = Arc<ServerSession>;
    type IntoIter = Sessions;

    fn into_iter(self) -> Self::IntoIter {
        self.sessions()
    }
}
