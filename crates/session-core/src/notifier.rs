//! Session lifecycle event dispatch
//!
//! The registry only records which listeners are interested in session
//! events. The lifecycle owner drives a [`SessionNotifier`] to actually
//! invoke them once it has decided a session was opened, expired or closed.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::listener::SessionListener;
use crate::registry::SessionRegistry;
use crate::session::{ServerSession, SessionState};
use crate::types::SessionId;

/// Lifecycle transition delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Registered,
    Unregistered,
    Expired,
    Closed,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Registered => "registered",
            SessionEvent::Unregistered => "unregistered",
            SessionEvent::Expired => "expired",
            SessionEvent::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Dispatches lifecycle events to the registry's listeners
#[derive(Debug, Clone)]
pub struct SessionNotifier {
    registry: Arc<SessionRegistry>,
}

impl SessionNotifier {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every listener subscribed at the time of the call.
    ///
    /// A panicking listener is logged and skipped. Returns how many
    /// listeners completed normally.
    pub fn notify(&self, event: SessionEvent, session: &ServerSession) -> usize {
        let listeners = self.registry.listeners();
        let mut delivered = 0;

        for listener in &listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_ref(), event, session)));
            match outcome {
                Ok(()) => delivered += 1,
                Err(_) => warn!(
                    session_id = %session.id(),
                    %event,
                    "Session listener panicked"
                ),
            }
        }

        debug!(
            session_id = %session.id(),
            %event,
            delivered,
            total = listeners.len(),
            "Dispatched session event"
        );
        delivered
    }

    /// Register a session and tell listeners about it
    pub fn register_and_notify(&self, session: Arc<ServerSession>) -> Arc<ServerSession> {
        let session = self.registry.register_session(session);
        self.notify(SessionEvent::Registered, &session);
        session
    }

    /// Unregister a session and tell listeners about it
    pub fn unregister_and_notify(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        let session = self.registry.unregister_session(id)?;
        self.notify(SessionEvent::Unregistered, &session);
        Some(session)
    }

    /// Mark a session expired, remove it, and notify listeners
    pub fn expire_session(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        self.end_session(id, SessionState::Expired, SessionEvent::Expired)
    }

    /// Mark a session closed, remove it, and notify listeners
    pub fn close_session(&self, id: SessionId) -> Option<Arc<ServerSession>> {
        self.end_session(id, SessionState::Closed, SessionEvent::Closed)
    }

    fn end_session(
        &self,
        id: SessionId,
        state: SessionState,
        event: SessionEvent,
    ) -> Option<Arc<ServerSession>> {
        let session = self.registry.unregister_session(id)?;
        session.set_state(state);
        self.notify(event, &session);
        self.notify(SessionEvent::Unregistered, &session);
        Some(session)
    }
}

fn dispatch(listener: &dyn SessionListener, event: SessionEvent, session: &ServerSession) {
    match event {
        SessionEvent::Registered => listener.session_registered(session),
        SessionEvent::Unregistered => listener.session_unregistered(session),
        SessionEvent::Expired => listener.session_expired(session),
        SessionEvent::Closed => listener.session_closed(session),
    }
}
