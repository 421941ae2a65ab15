//! Transport connection handles
//!
//! The registry never reads from or writes to a connection. It only needs to
//! store one per client and to recognise the same connection again when the
//! transport layer reports it closed.

use std::fmt;
use std::sync::Arc;

use crate::types::{ConnectionId, NetworkAddress};

/// An open transport channel supplied by the connection layer.
///
/// Two handles refer to the same connection when their [`ConnectionId`]s are
/// equal, regardless of whether they are the same allocation.
pub trait Connection: fmt::Debug + Send + Sync {
    /// Identifier unique among the node's live connections
    fn id(&self) -> ConnectionId;

    /// Remote address of the peer, if the transport knows it
    fn remote_address(&self) -> Option<NetworkAddress> {
        None
    }
}

/// Shared handle to a connection
pub type ConnectionRef = Arc<dyn Connection>;

/// Value equality between two connection handles
pub fn same_connection(a: &dyn Connection, b: &dyn Connection) -> bool {
    a.id() == b.id()
}
