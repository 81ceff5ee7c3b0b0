//! Verifier state machine.
//!
//! One [`VerifierSm`] drives one proof exchange from the verifier's side.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods mutate the machine and return `Vec<VerifierAction>`
//! - The caller executes the actions (sends messages over a connection)
//! - No I/O, no stored connection, no clock
//!
//! Sending the request is the only transition whose actions must succeed for
//! the transition to stand. Callers apply it to a clone and keep the clone
//! only once delivery succeeded.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ send_request ┌─────────────┐ presentation ┌──────────┐
//! │ Initial │─────────────>│ RequestSent │─────────────>│ Accepted │
//! └─────────┘              └─────────────┘              └──────────┘
//!      │                     │         │
//!      │  problem-report     │         │ malformed presentation
//!      │                     ↓         ↓
//!      │               ┌──────────┐ ┌────────┐
//!      └──────────────>│ Rejected │ │ Failed │
//!                      └──────────┘ └────────┘
//! ```
//!
//! `Initial` also accepts a presentation on the request's thread. That covers
//! the connectionless flow, where the caller hands the request message to the
//! prover out of band instead of calling `send_request`.
//!
//! # Verification outcome
//!
//! A presentation that parses always ends in `Accepted`, carrying `Verified`
//! or `NotVerified`. Only a presentation that cannot be decoded, or a backend
//! that cannot evaluate the proof, ends in `Failed`.

use proofex_proto::{
    AckStatus, PresentationAck, PresentationMessage, PresentationPayload, ProblemReport,
    ProofRequestData, ProtocolMessage, RequestPresentation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    error::{Result, VerifierError},
    state::{ProofState, VerificationResult},
    verification::{PresentationVerifier, check_answers_request},
};

/// Problem code sent when the presentation does not verify.
pub const INVALID_PRESENTATION: &str = "invalid-presentation";
/// Problem code sent when the presentation cannot be decoded.
pub const MALFORMED_PRESENTATION: &str = "malformed-presentation";
/// Problem code sent when the verifier backend cannot evaluate the proof.
pub const VERIFICATION_ERROR: &str = "verification-error";
/// Problem code sent when the connection fails mid-exchange.
pub const TRANSPORT_ERROR: &str = "transport-error";

/// Actions returned by the verifier state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierAction {
    /// Send this message to the prover
    Send(ProtocolMessage),
}

/// Inbound events the machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierEvent {
    /// A decodable presentation message
    PresentationReceived(PresentationMessage),
    /// A presentation on some thread whose body could not be decoded
    MalformedPresentation {
        /// Thread the message claimed
        thread_id: String,
        /// Decoding failure
        reason: String,
    },
    /// The prover declined or reported a problem
    ProblemReportReceived(ProblemReport),
}

impl VerifierEvent {
    /// Thread the event belongs to.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::PresentationReceived(msg) => Some(msg.thread.thid.as_str()),
            Self::MalformedPresentation { thread_id, .. } => Some(thread_id.as_str()),
            Self::ProblemReportReceived(report) => report.thread.as_ref().map(|t| t.thid.as_str()),
        }
    }
}

/// Internal state with the data each state carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifierState {
    /// Request built, not sent
    Initial,
    /// Request sent, awaiting the presentation
    RequestSent,
    /// Presentation received and evaluated
    Accepted {
        /// What the prover disclosed
        presentation: PresentationPayload,
        /// Verification outcome, never `Undefined`
        result: VerificationResult,
    },
    /// Prover declined
    Rejected {
        /// The prover's report
        problem_report: ProblemReport,
    },
    /// Exchange could not complete
    Failed {
        /// Report sent to the prover
        problem_report: ProblemReport,
    },
}

impl VerifierState {
    /// Public code of this state.
    pub fn code(&self) -> ProofState {
        match self {
            Self::Initial => ProofState::Initialized,
            Self::RequestSent => ProofState::OfferSent,
            Self::Accepted { .. } => ProofState::Accepted,
            Self::Rejected { .. } => ProofState::Rejected,
            Self::Failed { .. } => ProofState::Failed,
        }
    }
}

/// Verifier state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierSm {
    /// Caller correlation id
    source_id: String,
    /// What is being asked for
    request_data: ProofRequestData,
    /// The request message, built once at creation
    request: RequestPresentation,
    /// Current state
    state: VerifierState,
}

impl VerifierSm {
    /// Create a machine in `Initial` with its request message already built.
    pub fn new(
        source_id: impl Into<String>,
        request_data: ProofRequestData,
        comment: Option<String>,
    ) -> Result<Self> {
        let request = RequestPresentation::new(&request_data, comment)?;
        Ok(Self { source_id: source_id.into(), request_data, request, state: VerifierState::Initial })
    }

    /// Caller correlation id.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Thread id of the exchange (the request message id).
    pub fn thread_id(&self) -> &str {
        self.request.id.as_str()
    }

    /// Public state.
    pub fn state(&self) -> ProofState {
        self.state.code()
    }

    /// Internal state.
    pub fn state_object(&self) -> &VerifierState {
        &self.state
    }

    /// Requested attributes and predicates.
    pub fn request_data(&self) -> &ProofRequestData {
        &self.request_data
    }

    /// The request message. Available in every state.
    pub fn presentation_request(&self) -> &RequestPresentation {
        &self.request
    }

    /// Verification outcome, present only once accepted.
    pub fn verification_result(&self) -> Option<VerificationResult> {
        match self.state {
            VerifierState::Accepted { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Verification outcome, `Undefined` until accepted.
    pub fn presentation_status(&self) -> VerificationResult {
        self.verification_result().unwrap_or(VerificationResult::Undefined)
    }

    /// Disclosed presentation, present only once accepted.
    pub fn presentation(&self) -> Option<&PresentationPayload> {
        match &self.state {
            VerifierState::Accepted { presentation, .. } => Some(presentation),
            _ => None,
        }
    }

    /// Problem report that ended the exchange, if any.
    pub fn problem_report(&self) -> Option<&ProblemReport> {
        match &self.state {
            VerifierState::Rejected { problem_report } | VerifierState::Failed { problem_report } => {
                Some(problem_report)
            },
            _ => None,
        }
    }

    /// Presentation and outcome of an accepted exchange.
    ///
    /// # Errors
    ///
    /// `NotReady` before the exchange is accepted.
    pub fn proof(&self) -> Result<(&PresentationPayload, VerificationResult)> {
        match &self.state {
            VerifierState::Accepted { presentation, result } => Ok((presentation, *result)),
            other => Err(VerifierError::NotReady(format!(
                "no presentation in state {}",
                other.code()
            ))),
        }
    }

    /// Transition `Initial` to `RequestSent`.
    ///
    /// Returns the send action for the request message.
    ///
    /// # Errors
    ///
    /// `InvalidState` if not in `Initial`.
    pub fn send_request(&mut self) -> Result<Vec<VerifierAction>> {
        if self.state != VerifierState::Initial {
            return Err(VerifierError::InvalidState {
                state: self.state(),
                operation: "send_request".to_string(),
            });
        }

        self.state = VerifierState::RequestSent;
        trace!(source_id = %self.source_id, thread_id = %self.thread_id(), "request sent");

        Ok(vec![VerifierAction::Send(ProtocolMessage::RequestPresentation(self.request.clone()))])
    }

    /// Whether `event` would move this machine.
    pub fn can_handle(&self, event: &VerifierEvent) -> bool {
        if !matches!(self.state, VerifierState::Initial | VerifierState::RequestSent) {
            return false;
        }
        event.thread_id() == Some(self.thread_id())
    }

    /// Apply an inbound event.
    ///
    /// Events that do not belong to this exchange, or arrive in a state that
    /// cannot take them, are ignored and return no actions. Returned actions
    /// are follow-ups for the prover (ack or problem report); failing to
    /// deliver them does not change the outcome.
    pub fn handle(
        &mut self,
        event: VerifierEvent,
        verifier: &dyn PresentationVerifier,
    ) -> Vec<VerifierAction> {
        if !self.can_handle(&event) {
            debug!(
                source_id = %self.source_id,
                state = %self.state(),
                event_thread = ?event.thread_id(),
                "ignoring event"
            );
            return vec![];
        }

        match event {
            VerifierEvent::PresentationReceived(message) => self.receive_presentation(&message, verifier),
            VerifierEvent::MalformedPresentation { reason, .. } => {
                self.fail(MALFORMED_PRESENTATION, reason)
            },
            VerifierEvent::ProblemReportReceived(problem_report) => {
                debug!(
                    source_id = %self.source_id,
                    code = %problem_report.description.code,
                    "prover declined"
                );
                self.state = VerifierState::Rejected { problem_report };
                vec![]
            },
        }
    }

    fn receive_presentation(
        &mut self,
        message: &PresentationMessage,
        verifier: &dyn PresentationVerifier,
    ) -> Vec<VerifierAction> {
        let presentation = match message.payload() {
            Ok(payload) => payload,
            Err(err) => return self.fail(MALFORMED_PRESENTATION, err.to_string()),
        };

        let result = match check_answers_request(&self.request_data, &presentation) {
            Err(mismatch) => {
                debug!(source_id = %self.source_id, %mismatch, "presentation does not answer request");
                VerificationResult::NotVerified
            },
            Ok(()) => match verifier.verify(&self.request_data, &presentation) {
                Ok(valid) => VerificationResult::from(valid),
                Err(err) => {
                    warn!(source_id = %self.source_id, error = %err, "verifier backend failed");
                    return self.fail(VERIFICATION_ERROR, err.to_string());
                },
            },
        };

        debug!(source_id = %self.source_id, ?result, "presentation accepted");
        self.state = VerifierState::Accepted { presentation, result };

        let reply = match result {
            VerificationResult::Verified => ProtocolMessage::PresentationAck(PresentationAck::new(
                self.thread_id(),
                AckStatus::Ok,
            )),
            _ => ProtocolMessage::ProblemReport(ProblemReport::new(
                INVALID_PRESENTATION,
                Some("presentation did not verify".to_string()),
                self.thread_id(),
            )),
        };
        vec![VerifierAction::Send(reply)]
    }

    /// Fail a non-terminal exchange for a reason outside the protocol.
    ///
    /// Returns the problem report to send; terminal exchanges are left alone
    /// and return nothing.
    pub fn abort(&mut self, code: &str, reason: String) -> Vec<VerifierAction> {
        if self.state().is_terminal() {
            return vec![];
        }
        self.fail(code, reason)
    }

    fn fail(&mut self, code: &str, reason: String) -> Vec<VerifierAction> {
        warn!(source_id = %self.source_id, code, %reason, "exchange failed");
        let problem_report = ProblemReport::new(code, Some(reason), self.thread_id());
        self.state = VerifierState::Failed { problem_report: problem_report.clone() };
        vec![VerifierAction::Send(ProtocolMessage::ProblemReport(problem_report))]
    }

    /// Check invariants that serde alone cannot express.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.source_id.is_empty() {
            return Err(VerifierError::InvalidDocument("empty source_id".to_string()));
        }
        if self.request_data.is_empty() {
            return Err(VerifierError::InvalidDocument("empty request".to_string()));
        }
        let embedded = self
            .request
            .request_data()
            .map_err(|err| VerifierError::InvalidDocument(err.to_string()))?;
        if embedded != self.request_data {
            return Err(VerifierError::InvalidDocument(
                "request message does not match request data".to_string(),
            ));
        }
        if let VerifierState::Accepted { result: VerificationResult::Undefined, .. } = self.state {
            return Err(VerifierError::InvalidDocument(
                "accepted exchange without verification result".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proofex_proto::{AttrSpec, PresentationPayload, RequestedProof, RevealedAttr};

    use super::*;

    struct Fixed(std::result::Result<bool, String>);

    impl PresentationVerifier for Fixed {
        fn verify(
            &self,
            _request: &ProofRequestData,
            _presentation: &PresentationPayload,
        ) -> Result<bool> {
            self.0.clone().map_err(VerifierError::Backend)
        }
    }

    fn machine() -> VerifierSm {
        let data = ProofRequestData::with_nonce("proof-req", "1")
            .set_requested_attributes(vec![AttrSpec::new("age")]);
        VerifierSm::new("1", data, None).unwrap()
    }

    fn payload() -> PresentationPayload {
        let mut requested_proof = RequestedProof::default();
        requested_proof.revealed_attrs.insert(
            "attribute_0".to_string(),
            RevealedAttr { sub_proof_index: 0, raw: "30".to_string(), encoded: "30".to_string() },
        );
        PresentationPayload { requested_proof, proof: serde_json::json!({}), identifiers: vec![] }
    }

    fn presentation_for(sm: &VerifierSm) -> VerifierEvent {
        VerifierEvent::PresentationReceived(
            PresentationMessage::new(sm.thread_id(), &payload()).unwrap(),
        )
    }

    #[test]
    fn lifecycle_to_verified() {
        let mut sm = machine();
        assert_eq!(sm.state(), ProofState::Initialized);
        assert_eq!(sm.presentation_status(), VerificationResult::Undefined);

        let actions = sm.send_request().unwrap();
        assert_eq!(sm.state(), ProofState::OfferSent);
        assert!(matches!(
            &actions[..],
            [VerifierAction::Send(ProtocolMessage::RequestPresentation(_))]
        ));

        let event = presentation_for(&sm);
        let actions = sm.handle(event, &Fixed(Ok(true)));
        assert_eq!(sm.state(), ProofState::Accepted);
        assert_eq!(sm.verification_result(), Some(VerificationResult::Verified));
        assert!(matches!(&actions[..], [VerifierAction::Send(ProtocolMessage::PresentationAck(_))]));
        assert_eq!(sm.presentation(), Some(&payload()));
        assert!(matches!(
            sm.state_object(),
            VerifierState::Accepted { result: VerificationResult::Verified, .. }
        ));
    }

    #[test]
    fn invalid_proof_is_accepted_as_not_verified() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let event = presentation_for(&sm);

        let actions = sm.handle(event, &Fixed(Ok(false)));
        assert_eq!(sm.state(), ProofState::Accepted);
        assert_eq!(sm.verification_result(), Some(VerificationResult::NotVerified));
        assert!(matches!(&actions[..], [VerifierAction::Send(ProtocolMessage::ProblemReport(_))]));
    }

    #[test]
    fn backend_error_fails_exchange() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let event = presentation_for(&sm);

        sm.handle(event, &Fixed(Err("ledger unreachable".to_string())));
        assert_eq!(sm.state(), ProofState::Failed);
        assert_eq!(sm.verification_result(), None);
        assert_eq!(sm.problem_report().unwrap().description.code, VERIFICATION_ERROR);
    }

    #[test]
    fn malformed_presentation_fails_exchange() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let event = VerifierEvent::MalformedPresentation {
            thread_id: sm.thread_id().to_string(),
            reason: "bad attachment".to_string(),
        };

        let actions = sm.handle(event, &Fixed(Ok(true)));
        assert_eq!(sm.state(), ProofState::Failed);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn problem_report_rejects_exchange() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let report = ProblemReport::new("declined", None, sm.thread_id());

        let actions = sm.handle(VerifierEvent::ProblemReportReceived(report), &Fixed(Ok(true)));
        assert_eq!(sm.state(), ProofState::Rejected);
        assert!(actions.is_empty());
    }

    #[test]
    fn other_threads_are_ignored() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let event = VerifierEvent::PresentationReceived(
            PresentationMessage::new("someone-else", &payload()).unwrap(),
        );

        assert!(!sm.can_handle(&event));
        assert!(sm.handle(event, &Fixed(Ok(true))).is_empty());
        assert_eq!(sm.state(), ProofState::OfferSent);
    }

    #[test]
    fn terminal_states_ignore_further_events() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let event = presentation_for(&sm);
        sm.handle(event.clone(), &Fixed(Ok(true)));

        assert!(sm.handle(event, &Fixed(Ok(false))).is_empty());
        assert_eq!(sm.verification_result(), Some(VerificationResult::Verified));
    }

    #[test]
    fn abort_only_affects_open_exchanges() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let actions = sm.abort(TRANSPORT_ERROR, "connection reset".to_string());
        assert_eq!(sm.state(), ProofState::Failed);
        assert_eq!(actions.len(), 1);

        assert!(sm.abort(TRANSPORT_ERROR, "again".to_string()).is_empty());
        assert_eq!(sm.problem_report().unwrap().description.en.as_deref(), Some("connection reset"));
    }

    #[test]
    fn request_cannot_be_sent_twice() {
        let mut sm = machine();
        sm.send_request().unwrap();
        let result = sm.send_request();
        assert!(matches!(result, Err(VerifierError::InvalidState { .. })));
    }

    #[test]
    fn presentation_accepted_without_sending_request() {
        let mut sm = machine();
        let event = presentation_for(&sm);
        sm.handle(event, &Fixed(Ok(true)));
        assert_eq!(sm.state(), ProofState::Accepted);
    }

    #[test]
    fn proof_before_acceptance_is_not_ready() {
        let sm = machine();
        assert!(matches!(sm.proof(), Err(VerifierError::NotReady(_))));
        assert_eq!(sm.presentation(), None);
        assert_eq!(sm.state_object(), &VerifierState::Initial);
    }

    #[test]
    fn request_message_is_stable() {
        let mut sm = machine();
        let before = sm.presentation_request().clone();
        sm.send_request().unwrap();
        assert_eq!(sm.presentation_request(), &before);
        assert_eq!(sm.thread_id(), before.id.as_str());
    }
}
