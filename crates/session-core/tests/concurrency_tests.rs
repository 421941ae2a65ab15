//! Concurrent access tests
//!
//! The registry is shared between connection I/O threads and the session
//! lifecycle thread. These tests hammer it from several threads and check
//! that per-key invariants survive.

use std::sync::Arc;
use std::thread;

use rsm_session_core::{
    ClientId, Connection, ConnectionId, ConnectionRef, NetworkAddress, ServerSession, SessionId,
    SessionRegistry,
};

#[derive(Debug)]
struct FakeConnection(u64);

impl Connection for FakeConnection {
    fn id(&self) -> ConnectionId {
        ConnectionId(self.0)
    }
}

const THREADS: u64 = 8;
const PER_THREAD: u64 = 200;

#[test]
fn test_parallel_register_and_unregister() {
    let registry = Arc::new(SessionRegistry::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let id = SessionId(t * PER_THREAD + i);
                    let client = ClientId::new();
                    registry.register_address(client, NetworkAddress::new("10.0.0.1", i as u16));
                    registry.register_session(Arc::new(ServerSession::new(id, client)));
                    if i % 2 == 0 {
                        assert!(registry.unregister_session(id).is_some());
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (THREADS * PER_THREAD / 2) as usize;
    let stats = registry.stats();
    assert_eq!(stats.sessions, expected);
    assert_eq!(stats.clients, expected);
    assert_eq!(stats.addresses, expected);
    for session in registry.sessions() {
        assert!(session.address().is_some());
        assert_eq!(session.id().as_u64() % 2, 1);
    }
}

#[test]
fn test_last_connection_wins_per_client() {
    let registry = Arc::new(SessionRegistry::new());
    let client = ClientId::new();
    let session = registry.register_session(Arc::new(ServerSession::new(SessionId(1), client)));

    // Each thread rebinds the same client repeatedly; the final write is
    // from whichever thread finishes last, and the session must agree with
    // the directory once all writers are done.
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let conn: ConnectionRef = Arc::new(FakeConnection(t * PER_THREAD + i));
                    registry.register_connection(client, conn);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let bound = registry.connection(&client).map(|c| c.id());
    assert!(bound.is_some());
    let final_conn: ConnectionRef = Arc::new(FakeConnection(u64::MAX));
    registry.register_connection(client, final_conn);
    assert_eq!(session.connection().map(|c| c.id()), Some(ConnectionId(u64::MAX)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_iteration_during_churn() {
    let registry = Arc::new(SessionRegistry::new());
    for id in 0..100 {
        registry.register_session(Arc::new(ServerSession::new(SessionId(id), ClientId::new())));
    }

    let writer = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for id in 100..400 {
                registry.register_session(Arc::new(ServerSession::new(SessionId(id), ClientId::new())));
                registry.unregister_session(SessionId(id - 100));
                tokio::task::yield_now().await;
            }
        })
    };

    let reader = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut observed = 0;
            for _ in 0..50 {
                for session in registry.sessions() {
                    assert!(session.is_active());
                    observed += 1;
                }
                tokio::task::yield_now().await;
            }
            observed
        })
    };

    writer.await.unwrap();
    assert!(reader.await.unwrap() > 0);
    assert_eq!(registry.len(), 100);
}
