//! Session listener subscriptions
//!
//! The registry keeps track of who is interested in session lifecycle
//! transitions but never calls them itself. Dispatch is the job of
//! [`SessionNotifier`](crate::notifier::SessionNotifier).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::ServerSession;

/// Observer of session lifecycle transitions.
///
/// All callbacks default to no-ops so implementors only override what they
/// care about.
pub trait SessionListener: Send + Sync {
    /// Called after a session has been registered
    fn session_registered(&self, _session: &ServerSession) {}

    /// Called after a session has been removed from the registry
    fn session_unregistered(&self, _session: &ServerSession) {}

    /// Called when a session times out
    fn session_expired(&self, _session: &ServerSession) {}

    /// Called when a client closes its session
    fn session_closed(&self, _session: &ServerSession) {}
}

/// Set of listeners keyed by allocation identity.
///
/// Iteration order is unspecified.
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a listener. Returns false if it was already present.
    pub fn insert(&self, listener: Arc<dyn SessionListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener. Returns false if it was not present.
    pub fn remove(&self, listener: &Arc<dyn SessionListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn contains(&self, listener: &Arc<dyn SessionListener>) -> bool {
        self.listeners.read().iter().any(|l| same_listener(l, listener))
    }

    /// Point-in-time copy of the current listeners
    pub fn snapshot(&self) -> Vec<Arc<dyn SessionListener>> {
        self.listeners.read().clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

// Compare data pointers only; vtable pointers for the same type may differ
// between codegen units.
fn same_listener(a: &Arc<dyn SessionListener>, b: &Arc<dyn SessionListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl SessionListener for Noop {}

    #[test]
    fn test_insert_is_idempotent() {
        let set = ListenerSet::new();
        let listener: Arc<dyn SessionListener> = Arc::new(Noop);

        assert!(set.insert(listener.clone()));
        assert!(!set.insert(listener.clone()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_instances_are_distinct_entries() {
        let set = ListenerSet::new();
        let a: Arc<dyn SessionListener> = Arc::new(Noop);
        let b: Arc<dyn SessionListener> = Arc::new(Noop);

        set.insert(a.clone());
        set.insert(b.clone());
        assert_eq!(set.len(), 2);

        assert!(set.remove(&a));
        assert!(!set.contains(&a));
        assert!(set.contains(&b));
    }

    #[test]
    fn test_remove_missing_listener() {
        let set = ListenerSet::new();
        let listener: Arc<dyn SessionListener> = Arc::new(Noop);
        assert!(!set.remove(&listener));
        assert!(set.is_empty());
    }
}
