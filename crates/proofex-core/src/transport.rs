//! Connection collaborator abstraction.
//!
//! The proof exchange rides on an already established pairwise connection.
//! Establishing, encrypting and routing are somebody else's job; this module
//! only states what the verifier needs from a connection:
//!
//! - push: hand a protocol message to the connection for delivery
//! - pull: fetch messages that arrived for us and are still unhandled
//! - acknowledge: mark a fetched message as handled so it is not seen again
//!
//! Connections are referenced by handle and resolved on every use. An exchange
//! never owns its connection.

use std::fmt;

use async_trait::async_trait;
use proofex_proto::ProtocolMessage;
use thiserror::Error;

/// Opaque reference to a connection owned by the collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(pub u32);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message waiting on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Collaborator-assigned id, used to mark the message handled
    pub uid: String,
    /// Raw JSON as received
    pub payload: String,
}

impl InboundMessage {
    /// Inbound message with the given uid and payload.
    pub fn new(uid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { uid: uid.into(), payload: payload.into() }
    }
}

/// Errors raised by the connection collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No connection behind the handle
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionHandle),

    /// Connection exists but cannot carry messages yet
    #[error("connection {0} is not ready")]
    NotReady(ConnectionHandle),

    /// Delivery or retrieval failed
    #[error("i/o: {0}")]
    Io(String),
}

/// Connection collaborator.
///
/// Implementations must be safe to share across tasks; the verifier facade
/// calls them concurrently for distinct exchanges.
#[async_trait]
pub trait Connections: Send + Sync + 'static {
    /// Whether the connection resolves and can carry messages.
    fn is_ready(&self, connection: ConnectionHandle) -> bool;

    /// Deliver a message to the peer.
    ///
    /// # Errors
    ///
    /// `UnknownConnection`/`NotReady` if the handle does not resolve to a
    /// ready connection, `Io` if delivery fails.
    async fn send_message(
        &self,
        connection: ConnectionHandle,
        message: &ProtocolMessage,
    ) -> Result<(), TransportError>;

    /// Fetch unhandled inbound messages.
    ///
    /// Returns an empty vector when nothing is queued. Absence of messages is
    /// never an error.
    async fn fetch_messages(
        &self,
        connection: ConnectionHandle,
    ) -> Result<Vec<InboundMessage>, TransportError>;

    /// Mark a fetched message as handled.
    async fn mark_handled(
        &self,
        connection: ConnectionHandle,
        uid: &str,
    ) -> Result<(), TransportError>;
}
