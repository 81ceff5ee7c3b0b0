//! In-memory connection collaborator.
//!
//! Each connection keeps an inbox of unhandled messages (what the prover
//! sent us) and an outbox of everything the verifier sent. Faults are
//! injected per connection and consumed by the next matching call.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use proofex_core::{ConnectionHandle, Connections, InboundMessage, TransportError};
use proofex_proto::ProtocolMessage;
use tracing::trace;

#[derive(Debug, Default)]
struct SimConnection {
    ready: bool,
    inbox: Vec<InboundMessage>,
    outbox: Vec<ProtocolMessage>,
    next_uid: u64,
    failing_sends: u32,
    failing_fetches: u32,
}

#[derive(Debug, Default)]
struct State {
    connections: HashMap<ConnectionHandle, SimConnection>,
    next_handle: u32,
}

/// Simulated connections, safe to share across tasks.
#[derive(Debug, Default)]
pub struct SimConnections {
    state: Mutex<State>,
}

impl SimConnections {
    /// No connections.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, ready: bool) -> ConnectionHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let handle = ConnectionHandle(state.next_handle);
        state.connections.insert(handle, SimConnection { ready, ..SimConnection::default() });
        handle
    }

    /// Open a connection that can carry messages.
    pub fn open_ready(&self) -> ConnectionHandle {
        self.open(true)
    }

    /// Open a connection that is still being established.
    pub fn open_pending(&self) -> ConnectionHandle {
        self.open(false)
    }

    /// Finish establishing a pending connection.
    pub fn set_ready(&self, connection: ConnectionHandle) {
        if let Some(conn) = self.state().connections.get_mut(&connection) {
            conn.ready = true;
        }
    }

    /// Drop a connection. Its handle no longer resolves.
    pub fn close(&self, connection: ConnectionHandle) {
        self.state().connections.remove(&connection);
    }

    /// Queue a raw message from the peer. Returns its uid.
    pub fn deliver(&self, connection: ConnectionHandle, payload: impl Into<String>) -> String {
        let mut state = self.state();
        let Some(conn) = state.connections.get_mut(&connection) else {
            return String::new();
        };
        conn.next_uid += 1;
        let uid = format!("msg-{}", conn.next_uid);
        conn.inbox.push(InboundMessage::new(uid.clone(), payload));
        uid
    }

    /// Everything the verifier sent on `connection`, oldest first.
    pub fn sent(&self, connection: ConnectionHandle) -> Vec<ProtocolMessage> {
        self.state().connections.get(&connection).map(|c| c.outbox.clone()).unwrap_or_default()
    }

    /// Messages still waiting to be handled.
    pub fn pending(&self, connection: ConnectionHandle) -> Vec<InboundMessage> {
        self.state().connections.get(&connection).map(|c| c.inbox.clone()).unwrap_or_default()
    }

    /// Make the next send on `connection` fail with an i/o error.
    pub fn fail_next_send(&self, connection: ConnectionHandle) {
        if let Some(conn) = self.state().connections.get_mut(&connection) {
            conn.failing_sends += 1;
        }
    }

    /// Make the next fetch on `connection` fail with an i/o error.
    pub fn fail_next_fetch(&self, connection: ConnectionHandle) {
        if let Some(conn) = self.state().connections.get_mut(&connection) {
            conn.failing_fetches += 1;
        }
    }
}

fn ready_connection(
    state: &mut State,
    connection: ConnectionHandle,
) -> Result<&mut SimConnection, TransportError> {
    let conn = state
        .connections
        .get_mut(&connection)
        .ok_or(TransportError::UnknownConnection(connection))?;
    if !conn.ready {
        return Err(TransportError::NotReady(connection));
    }
    Ok(conn)
}

#[async_trait]
impl Connections for SimConnections {
    fn is_ready(&self, connection: ConnectionHandle) -> bool {
        self.state().connections.get(&connection).is_some_and(|c| c.ready)
    }

    async fn send_message(
        &self,
        connection: ConnectionHandle,
        message: &ProtocolMessage,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        let conn = ready_connection(&mut state, connection)?;
        if conn.failing_sends > 0 {
            conn.failing_sends -= 1;
            return Err(TransportError::Io("injected send failure".to_string()));
        }
        trace!(%connection, message_type = message.type_uri(), "sim send");
        conn.outbox.push(message.clone());
        Ok(())
    }

    async fn fetch_messages(
        &self,
        connection: ConnectionHandle,
    ) -> Result<Vec<InboundMessage>, TransportError> {
        let mut state = self.state();
        let conn = ready_connection(&mut state, connection)?;
        if conn.failing_fetches > 0 {
            conn.failing_fetches -= 1;
            return Err(TransportError::Io("injected fetch failure".to_string()));
        }
        Ok(conn.inbox.clone())
    }

    async fn mark_handled(
        &self,
        connection: ConnectionHandle,
        uid: &str,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        let conn = ready_connection(&mut state, connection)?;
        let before = conn.inbox.len();
        conn.inbox.retain(|message| message.uid != uid);
        if conn.inbox.len() == before {
            return Err(TransportError::Io(format!("no pending message {uid}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proofex_proto::ProblemReport;

    use super::*;

    #[tokio::test]
    async fn unknown_and_pending_connections_are_distinguished() {
        let sim = SimConnections::new();
        let pending = sim.open_pending();

        assert!(!sim.is_ready(pending));
        assert_eq!(sim.fetch_messages(pending).await, Err(TransportError::NotReady(pending)));
        assert_eq!(
            sim.fetch_messages(ConnectionHandle(99)).await,
            Err(TransportError::UnknownConnection(ConnectionHandle(99)))
        );

        sim.set_ready(pending);
        assert!(sim.is_ready(pending));
    }

    #[tokio::test]
    async fn handled_messages_leave_the_inbox() {
        let sim = SimConnections::new();
        let conn = sim.open_ready();
        let first = sim.deliver(conn, "a");
        sim.deliver(conn, "b");

        sim.mark_handled(conn, &first).await.unwrap();
        let pending = sim.fetch_messages(conn).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, "b");
        assert!(sim.mark_handled(conn, &first).await.is_err());
    }

    #[tokio::test]
    async fn injected_send_failure_is_consumed() {
        let sim = SimConnections::new();
        let conn = sim.open_ready();
        let message = ProtocolMessage::ProblemReport(ProblemReport::new("x", None, "t"));

        sim.fail_next_send(conn);
        assert!(matches!(sim.send_message(conn, &message).await, Err(TransportError::Io(_))));
        sim.send_message(conn, &message).await.unwrap();
        assert_eq!(sim.sent(conn).len(), 1);
    }
}
