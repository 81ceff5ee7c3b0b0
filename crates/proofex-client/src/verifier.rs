//! Verifier facade.
//!
//! [`Verifier`] owns the handle registry and the two collaborators. Each
//! operation resolves its handle, locks that exchange for the whole call,
//! drives the state machine, and executes the returned actions against the
//! connection collaborator.
//!
//! Operations on the same handle queue behind one another; operations on
//! distinct handles run concurrently.

use std::sync::Arc;

use proofex_core::{
    ConnectionHandle, Connections, Handle, HandleRegistry, PresentationVerifier, ProofState,
    Result, SerializedDocument, TransportError, VerificationResult, VerifierAction, VerifierError,
    VerifierSm, adapter, codec,
    machine::TRANSPORT_ERROR,
};
use proofex_proto::PresentationPayload;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, trace, warn};

use crate::{config::VerifierConfig, exchange::ProofExchange, params::ProofCreateParams};

/// Opaque reference to a live proof exchange.
pub type ProofHandle = Handle;

/// What an accepted exchange produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofResult {
    /// Disclosed attributes and the proof
    pub presentation: PresentationPayload,
    /// Verification outcome
    pub verification_result: VerificationResult,
}

/// Verifier-side operation surface for proof exchanges.
pub struct Verifier<C, V> {
    config: VerifierConfig,
    connections: Arc<C>,
    backend: Arc<V>,
    registry: HandleRegistry<ProofExchange>,
}

impl<C, V> Verifier<C, V>
where
    C: Connections,
    V: PresentationVerifier,
{
    /// Verifier with default configuration.
    pub fn new(connections: Arc<C>, backend: Arc<V>) -> Self {
        Self::with_config(VerifierConfig::default(), connections, backend)
    }

    /// Verifier with explicit configuration.
    pub fn with_config(config: VerifierConfig, connections: Arc<C>, backend: Arc<V>) -> Self {
        Self { config, connections, backend, registry: HandleRegistry::new() }
    }

    /// Active configuration.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Number of live exchanges.
    pub fn live_exchanges(&self) -> usize {
        self.registry.len()
    }

    /// Create an exchange in `Initialized`.
    ///
    /// # Errors
    ///
    /// `InvalidOption` if a required field is missing or empty. Nothing is
    /// allocated on failure.
    pub fn create(&self, params: ProofCreateParams) -> Result<ProofHandle> {
        let comment = params.comment.clone();
        let (source_id, request) = params.into_request(&self.config)?;
        let sm = VerifierSm::new(source_id, request, comment)?;
        let source_id = sm.source_id().to_string();
        let handle = self.registry.allocate(ProofExchange::new(sm));
        info!(%handle, %source_id, "proof exchange created");
        Ok(handle)
    }

    /// Encode the exchange as a durable document.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub async fn serialize(&self, handle: ProofHandle) -> Result<SerializedDocument> {
        let exchange = self.lock(handle).await?;
        codec::encode(&exchange.sm)
    }

    /// Restore an exchange from a durable document under a fresh handle.
    ///
    /// The restored exchange has no remembered connection.
    ///
    /// # Errors
    ///
    /// `UnknownError` kind if the document is incomplete, has an unknown
    /// version, or violates an invariant.
    pub fn deserialize(&self, document: &SerializedDocument) -> Result<ProofHandle> {
        let sm = codec::decode(document)?;
        let state = sm.state();
        let handle = self.registry.allocate(ProofExchange::new(sm));
        info!(%handle, %state, "proof exchange restored");
        Ok(handle)
    }

    /// Current state, `None` if the handle does not resolve.
    pub async fn get_state(&self, handle: ProofHandle) -> ProofState {
        match self.lock(handle).await {
            Ok(exchange) => exchange.sm.state(),
            Err(_) => ProofState::None,
        }
    }

    /// Poll the remembered connection and apply the first relevant message.
    ///
    /// An unresolved handle yields `None` rather than an error. An exchange
    /// with no remembered connection, or in a terminal state, is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidConnectionHandle` if the remembered connection is not ready.
    pub async fn update_state(&self, handle: ProofHandle) -> Result<ProofState> {
        let Ok(mut exchange) = self.lock(handle).await else {
            return Ok(ProofState::None);
        };
        let Some(connection) = exchange.connection else {
            trace!(%handle, "no connection to poll");
            return Ok(exchange.sm.state());
        };
        self.poll(&mut exchange, connection).await
    }

    /// Poll an explicit connection and remember it for later polls.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve,
    /// `InvalidConnectionHandle` if the connection is not ready.
    pub async fn update_state_with_connection(
        &self,
        handle: ProofHandle,
        connection: ConnectionHandle,
    ) -> Result<ProofState> {
        let mut exchange = self.lock(handle).await?;
        let state = self.poll(&mut exchange, connection).await?;
        exchange.connection = Some(connection);
        Ok(state)
    }

    /// Apply a message supplied by the caller instead of polling.
    ///
    /// The message is taken to be addressed to this exchange: one that cannot
    /// be read fails an open exchange as a malformed presentation. Follow-ups
    /// go over the remembered connection if there is one.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve. `InvalidJson` if
    /// the message is a well-formed message of another kind, or belongs to
    /// another exchange's thread; the exchange is unchanged in both cases.
    pub async fn update_state_with_message(
        &self,
        handle: ProofHandle,
        message: &str,
    ) -> Result<ProofState> {
        let mut exchange = self.lock(handle).await?;
        let event = adapter::decode_supplied(&exchange.sm, message)?;
        let actions = exchange.sm.handle(event, self.backend.as_ref());
        self.deliver_follow_ups(exchange.connection, actions).await;
        Ok(exchange.sm.state())
    }

    /// Send the proof request over `connection`.
    ///
    /// The transition only stands if the request was handed to the
    /// connection; on any error the exchange is unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle`, `InvalidConnectionHandle`, `InvalidState` if the
    /// request was already sent, or the transport error if delivery failed.
    pub async fn request_proof(&self, handle: ProofHandle, connection: ConnectionHandle) -> Result<()> {
        let mut exchange = self.lock(handle).await?;
        if !self.connections.is_ready(connection) {
            return Err(VerifierError::InvalidConnectionHandle(connection));
        }

        let mut next = exchange.sm.clone();
        for action in next.send_request()? {
            self.execute(connection, action).await?;
        }

        exchange.sm = next;
        exchange.connection = Some(connection);
        info!(%handle, %connection, thread_id = %exchange.sm.thread_id(), "proof requested");
        Ok(())
    }

    /// Wire form of the request message. Identical on every call.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub async fn get_proof_request_message(&self, handle: ProofHandle) -> Result<String> {
        let exchange = self.lock(handle).await?;
        adapter::encode_request(&exchange.sm)
    }

    /// Presentation and verification outcome of an accepted exchange.
    ///
    /// The result is held by the exchange, so `connection` is not consulted.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve, `NotReady` before
    /// the exchange is accepted.
    pub async fn get_proof(
        &self,
        handle: ProofHandle,
        connection: ConnectionHandle,
    ) -> Result<ProofResult> {
        let exchange = self.lock(handle).await?;
        trace!(%handle, %connection, "reading proof");
        let (presentation, verification_result) = exchange.sm.proof()?;
        Ok(ProofResult { presentation: presentation.clone(), verification_result })
    }

    /// Release the exchange. The handle never resolves again.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub fn release(&self, handle: ProofHandle) -> Result<()> {
        self.registry.release(handle)?;
        debug!(%handle, "proof exchange released");
        Ok(())
    }

    /// Caller correlation id.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub async fn get_source_id(&self, handle: ProofHandle) -> Result<String> {
        Ok(self.lock(handle).await?.sm.source_id().to_string())
    }

    /// Thread id of the exchange.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub async fn get_thread_id(&self, handle: ProofHandle) -> Result<String> {
        Ok(self.lock(handle).await?.sm.thread_id().to_string())
    }

    /// Verification outcome, `Undefined` until accepted.
    ///
    /// # Errors
    ///
    /// `InvalidProofHandle` if the handle does not resolve.
    pub async fn get_verification_result(&self, handle: ProofHandle) -> Result<VerificationResult> {
        Ok(self.lock(handle).await?.sm.presentation_status())
    }

    async fn lock(&self, handle: ProofHandle) -> Result<OwnedMutexGuard<ProofExchange>> {
        let entry = self.registry.resolve(handle)?;
        Ok(entry.lock_owned().await)
    }

    async fn poll(
        &self,
        exchange: &mut ProofExchange,
        connection: ConnectionHandle,
    ) -> Result<ProofState> {
        if exchange.sm.state().is_terminal() {
            return Ok(exchange.sm.state());
        }
        if !self.connections.is_ready(connection) {
            return Err(VerifierError::InvalidConnectionHandle(connection));
        }

        let messages = match self.connections.fetch_messages(connection).await {
            Ok(messages) => messages,
            Err(err @ (TransportError::UnknownConnection(_) | TransportError::NotReady(_))) => {
                return Err(err.into());
            },
            Err(err) => {
                let actions = exchange.sm.abort(TRANSPORT_ERROR, err.to_string());
                self.deliver_follow_ups(Some(connection), actions).await;
                return Ok(exchange.sm.state());
            },
        };

        trace!(%connection, count = messages.len(), "fetched messages");
        if let Some((uid, event)) = adapter::find_message_to_handle(&exchange.sm, messages) {
            let actions = exchange.sm.handle(event, self.backend.as_ref());
            self.deliver_follow_ups(Some(connection), actions).await;
            if let Err(err) = self.connections.mark_handled(connection, &uid).await {
                warn!(%connection, %uid, error = %err, "failed to mark message handled");
            }
        }

        Ok(exchange.sm.state())
    }

    async fn execute(&self, connection: ConnectionHandle, action: VerifierAction) -> Result<()> {
        match action {
            VerifierAction::Send(message) => {
                self.connections.send_message(connection, &message).await?;
                trace!(%connection, message_type = message.type_uri(), "sent");
                Ok(())
            },
        }
    }

    // Follow-ups inform the prover of an outcome that already stands.
    async fn deliver_follow_ups(
        &self,
        connection: Option<ConnectionHandle>,
        actions: Vec<VerifierAction>,
    ) {
        let Some(connection) = connection else {
            if !actions.is_empty() {
                debug!(count = actions.len(), "no connection; follow-ups not delivered");
            }
            return;
        };
        for action in actions {
            if let Err(err) = self.execute(connection, action).await {
                warn!(%connection, error = %err, "failed to deliver follow-up");
            }
        }
    }
}
