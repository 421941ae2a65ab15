//! # Session-Core - Session Registry for Replicated State Machine Servers
//!
//! This crate keeps the authoritative mapping between a client's logical
//! session, the network address it last reported, and the transport
//! connection it is currently using. The log applier, keep-alive handling and
//! request routing resolve where to deliver a session's responses through the
//! [`SessionRegistry`] instead of tracking reconnects themselves.
//!
//! ## Architecture
//!
//! - [`SessionRegistry`] owns the session, client, address and connection
//!   indexes plus the set of interested [`SessionListener`]s.
//! - [`SessionNotifier`] is used by the session lifecycle owner to dispatch
//!   lifecycle events to those listeners. The registry itself never calls a
//!   listener.
//! - [`SessionDirectory`] is the read-only surface handed to routers.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rsm_session_core::{ClientId, NetworkAddress, ServerSession, SessionId, SessionRegistry};
//!
//! let registry = SessionRegistry::new();
//! let client = ClientId::new();
//!
//! registry.register_address(client, NetworkAddress::new("10.0.0.7", 5555));
//! let session = registry.register_session(Arc::new(ServerSession::new(SessionId(7), client)));
//!
//! assert_eq!(session.address(), Some(NetworkAddress::new("10.0.0.7", 5555)));
//! assert!(registry.session_for_client(&client).is_some());
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod notifier;
pub mod registry;
pub mod session;
pub mod types;

pub use config::RegistryConfig;
pub use connection::{Connection, ConnectionRef};
pub use error::{RegistryError, Result};
pub use listener::{ListenerSet, SessionListener};
pub use notifier::{SessionEvent, SessionNotifier};
pub use registry::{RegistryStats, SessionDirectory, SessionRegistry, Sessions};
pub use session::{ServerSession, SessionState};
pub use types::{ClientId, ConnectionId, NetworkAddress, SessionId};
