//! Message adapter.
//!
//! Translates between raw wire messages and state machine events/actions.
//! Decoding is deliberately lenient about what it does not understand: a
//! message of another protocol is [`Inbound::Unrelated`], not an error, so it
//! can stay queued for whoever does handle it.
//!
//! The one distinction that must be exact is between a presentation we cannot
//! read (syntactically invalid, attributed to a thread) and a presentation we
//! can read but that does not verify. The first becomes
//! [`VerifierEvent::MalformedPresentation`] and fails the exchange; the second
//! is a normal [`VerifierEvent::PresentationReceived`].
//!
//! A message the caller hands over directly is addressed by the call itself,
//! so [`decode_supplied`] attributes unreadable input to the exchange instead
//! of dropping it.

use proofex_proto::{
    Envelope, ProtocolMessage, Thread,
    message::{PRESENTATION_TYPE, PROBLEM_REPORT_TYPE},
};
use tracing::trace;

use crate::{
    error::{Result, VerifierError},
    machine::{VerifierEvent, VerifierSm},
    transport::InboundMessage,
};

/// Result of decoding one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A verifier event
    Event(VerifierEvent),
    /// A well-formed message the verifier has no use for
    Unrelated {
        /// Its `@type`
        message_type: String,
    },
    /// Not attributable to any exchange
    Undecodable {
        /// Why
        reason: String,
    },
}

/// Decode a raw inbound message.
pub fn decode_inbound(raw: &str) -> Inbound {
    let envelope = match Envelope::peek(raw) {
        Ok(envelope) => envelope,
        Err(err) => return Inbound::Undecodable { reason: err.to_string() },
    };

    match envelope.message_type.as_str() {
        PRESENTATION_TYPE => match ProtocolMessage::from_json(raw) {
            Ok(ProtocolMessage::Presentation(message)) => {
                Inbound::Event(VerifierEvent::PresentationReceived(message))
            },
            Ok(other) => Inbound::Unrelated { message_type: other.type_uri().to_string() },
            Err(err) => match envelope.thread_id {
                Some(thread_id) => Inbound::Event(VerifierEvent::MalformedPresentation {
                    thread_id,
                    reason: err.to_string(),
                }),
                None => Inbound::Undecodable { reason: err.to_string() },
            },
        },
        PROBLEM_REPORT_TYPE => match ProtocolMessage::from_json(raw) {
            Ok(ProtocolMessage::ProblemReport(report)) => {
                Inbound::Event(VerifierEvent::ProblemReportReceived(report))
            },
            Ok(other) => Inbound::Unrelated { message_type: other.type_uri().to_string() },
            Err(err) => Inbound::Undecodable { reason: err.to_string() },
        },
        _ => Inbound::Unrelated { message_type: envelope.message_type },
    }
}

/// Decode a message the caller supplied for `sm`'s exchange.
///
/// Unlike a polled message, a supplied one is addressed to this exchange.
/// Anything that cannot be read becomes a malformed presentation on `sm`'s
/// thread, and a threadless problem report is attributed to it.
///
/// # Errors
///
/// `InvalidJson` if the message is a well-formed message of another kind.
/// `ForeignThread` if it names a different thread.
pub fn decode_supplied(sm: &VerifierSm, raw: &str) -> Result<VerifierEvent> {
    let event = match decode_inbound(raw) {
        Inbound::Event(event) => event,
        Inbound::Unrelated { message_type } => {
            return Err(VerifierError::InvalidJson(format!(
                "message type {message_type} is not handled by the verifier"
            )));
        },
        Inbound::Undecodable { reason } => {
            return Ok(VerifierEvent::MalformedPresentation {
                thread_id: sm.thread_id().to_string(),
                reason,
            });
        },
    };

    match event {
        VerifierEvent::ProblemReportReceived(mut report) if report.thread.is_none() => {
            report.thread = Some(Thread::new(sm.thread_id()));
            Ok(VerifierEvent::ProblemReportReceived(report))
        },
        event if event.thread_id() == Some(sm.thread_id()) => Ok(event),
        event => Err(VerifierError::ForeignThread {
            expected: sm.thread_id().to_string(),
            found: event.thread_id().unwrap_or_default().to_string(),
        }),
    }
}

/// First queued message `sm` can handle, with its collaborator uid.
pub fn find_message_to_handle(
    sm: &VerifierSm,
    messages: Vec<InboundMessage>,
) -> Option<(String, VerifierEvent)> {
    messages.into_iter().find_map(|message| match decode_inbound(&message.payload) {
        Inbound::Event(event) if sm.can_handle(&event) => Some((message.uid, event)),
        other => {
            trace!(uid = %message.uid, ?other, "skipping inbound message");
            None
        },
    })
}

/// Wire encoding of an outbound message.
pub fn encode_outbound(message: &ProtocolMessage) -> Result<String> {
    Ok(message.to_json()?)
}

/// Wire encoding of the exchange's request message.
pub fn encode_request(sm: &VerifierSm) -> Result<String> {
    encode_outbound(&ProtocolMessage::RequestPresentation(sm.presentation_request().clone()))
}
