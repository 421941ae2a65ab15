//! Registry diagnostics
//!
//! The registry only emits `tracing` events; the embedding node decides how
//! they are collected. These tests capture them with a scoped subscriber.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use rsm_session_core::{
    ClientId, Connection, ConnectionId, ServerSession, SessionId, SessionRegistry,
};
use tracing::Level;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct PeerConnection(u64);

impl Connection for PeerConnection {
    fn id(&self) -> ConnectionId {
        ConnectionId(self.0)
    }
}

fn capture<F: FnOnce()>(f: F) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    logs.contents()
}

#[test]
fn test_supersession_is_logged() {
    let output = capture(|| {
        let registry = SessionRegistry::new();
        let client = ClientId::new();
        registry.register_session(Arc::new(ServerSession::new(SessionId(1), client)));
        registry.register_session(Arc::new(ServerSession::new(SessionId(2), client)));
    });

    assert!(output.contains("Superseded client session"));
    assert!(output.contains("previous=1"));
    assert!(output.contains("session_id=2"));
}

#[test]
fn test_connection_unbind_is_logged_only_on_match() {
    let output = capture(|| {
        let registry = SessionRegistry::new();
        let client = ClientId::new();
        registry.register_connection(client, Arc::new(PeerConnection(4)));
        registry.unregister_connection(&PeerConnection(5));
    });
    assert!(!output.contains("Unbound closed connection"));

    let output = capture(|| {
        let registry = SessionRegistry::new();
        let client = ClientId::new();
        registry.register_connection(client, Arc::new(PeerConnection(4)));
        registry.unregister_connection(&PeerConnection(4));
    });
    assert!(output.contains("Unbound closed connection"));
    assert!(output.contains("connection=conn-4"));
}
