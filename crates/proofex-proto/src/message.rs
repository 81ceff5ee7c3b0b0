//! Present-proof protocol messages.
//!
//! # Protocol Flow
//!
//! ```text
//! Verifier                                   Prover
//!    │  request-presentation (@id = T)          │
//!    │─────────────────────────────────────────>│
//!    │  presentation (~thread.thid = T)         │
//!    │<─────────────────────────────────────────│
//!    │  ack | problem-report (~thread.thid = T) │
//!    │─────────────────────────────────────────>│
//! ```
//!
//! The prover may answer the request with a problem-report instead of a
//! presentation, which declines the exchange.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    attachment::Attachment,
    errors::{ProtocolError, Result},
    presentation::PresentationPayload,
    request::ProofRequestData,
};

/// `@type` of a presentation request.
pub const REQUEST_PRESENTATION_TYPE: &str =
    "https://didcomm.org/present-proof/1.0/request-presentation";
/// `@type` of a presentation.
pub const PRESENTATION_TYPE: &str = "https://didcomm.org/present-proof/1.0/presentation";
/// `@type` of a presentation acknowledgement.
pub const PRESENTATION_ACK_TYPE: &str = "https://didcomm.org/present-proof/1.0/ack";
/// `@type` of a problem report.
pub const PROBLEM_REPORT_TYPE: &str = "https://didcomm.org/report-problem/1.0/problem-report";

const REQUEST_ATTACHMENT_ID: &str = "request-presentation-0";
const PRESENTATION_ATTACHMENT_ID: &str = "presentation-0";

/// Message identifier: 128 random bits, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thread decorator linking a reply to the message that opened the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// `@id` of the first message of the thread
    pub thid: String,
}

impl Thread {
    /// Thread rooted at `thid`.
    pub fn new(thid: impl Into<String>) -> Self {
        Self { thid: thid.into() }
    }
}

/// Verifier to prover: please present a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPresentation {
    /// Message id; becomes the thread id of the exchange
    #[serde(rename = "@id")]
    pub id: MessageId,
    /// Free-form note for the prover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Encoded [`ProofRequestData`]
    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

impl RequestPresentation {
    /// Wrap request data in a new message.
    pub fn new(data: &ProofRequestData, comment: Option<String>) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(),
            comment,
            request_presentations_attach: vec![Attachment::from_json(REQUEST_ATTACHMENT_ID, data)?],
        })
    }

    /// Decode the embedded request data.
    pub fn request_data(&self) -> Result<ProofRequestData> {
        self.request_presentations_attach
            .first()
            .ok_or(ProtocolError::MissingAttachment { message_type: REQUEST_PRESENTATION_TYPE })?
            .decode_json()
    }
}

/// Prover to verifier: the disclosed proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationMessage {
    /// Message id
    #[serde(rename = "@id")]
    pub id: MessageId,
    /// Free-form note from the prover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Encoded [`PresentationPayload`]
    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<Attachment>,
    /// Thread of the request being answered
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl PresentationMessage {
    /// Wrap a payload as the answer to request `thid`.
    pub fn new(thid: impl Into<String>, payload: &PresentationPayload) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(),
            comment: None,
            presentations_attach: vec![Attachment::from_json(PRESENTATION_ATTACHMENT_ID, payload)?],
            thread: Thread::new(thid),
        })
    }

    /// Decode the embedded payload.
    pub fn payload(&self) -> Result<PresentationPayload> {
        self.presentations_attach
            .first()
            .ok_or(ProtocolError::MissingAttachment { message_type: PRESENTATION_TYPE })?
            .decode_json()
    }
}

/// Acknowledgement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    /// Presentation verified
    Ok,
    /// Presentation rejected
    Fail,
    /// Outcome not yet known
    Pending,
}

/// Verifier to prover: the presentation was received and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationAck {
    /// Message id
    #[serde(rename = "@id")]
    pub id: MessageId,
    /// Outcome
    pub status: AckStatus,
    /// Thread of the exchange
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl PresentationAck {
    /// Acknowledge thread `thid`.
    pub fn new(thid: impl Into<String>, status: AckStatus) -> Self {
        Self { id: MessageId::new(), status, thread: Thread::new(thid) }
    }
}

/// Problem description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDescription {
    /// Machine readable problem code
    pub code: String,
    /// Human readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

/// Either side: the exchange cannot continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReport {
    /// Message id
    #[serde(rename = "@id")]
    pub id: MessageId,
    /// What went wrong
    pub description: ProblemDescription,
    /// Thread the problem refers to
    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

impl ProblemReport {
    /// Problem report on thread `thid`.
    pub fn new(code: impl Into<String>, explain: Option<String>, thid: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            description: ProblemDescription { code: code.into(), en: explain },
            thread: Some(Thread::new(thid)),
        }
    }
}

/// Every message of the present-proof family, tagged by `@type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum ProtocolMessage {
    /// Presentation request
    #[serde(rename = "https://didcomm.org/present-proof/1.0/request-presentation")]
    RequestPresentation(RequestPresentation),
    /// Presentation
    #[serde(rename = "https://didcomm.org/present-proof/1.0/presentation")]
    Presentation(PresentationMessage),
    /// Acknowledgement
    #[serde(rename = "https://didcomm.org/present-proof/1.0/ack")]
    PresentationAck(PresentationAck),
    /// Problem report
    #[serde(rename = "https://didcomm.org/report-problem/1.0/problem-report")]
    ProblemReport(ProblemReport),
}

impl ProtocolMessage {
    /// The `@type` URI.
    pub fn type_uri(&self) -> &'static str {
        match self {
            Self::RequestPresentation(_) => REQUEST_PRESENTATION_TYPE,
            Self::Presentation(_) => PRESENTATION_TYPE,
            Self::PresentationAck(_) => PRESENTATION_ACK_TYPE,
            Self::ProblemReport(_) => PROBLEM_REPORT_TYPE,
        }
    }

    /// Message `@id`.
    pub fn id(&self) -> &MessageId {
        match self {
            Self::RequestPresentation(msg) => &msg.id,
            Self::Presentation(msg) => &msg.id,
            Self::PresentationAck(msg) => &msg.id,
            Self::ProblemReport(msg) => &msg.id,
        }
    }

    /// Thread id, if the message belongs to an existing thread.
    ///
    /// A request opens its own thread, so its id is the thread id.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::RequestPresentation(msg) => Some(msg.id.as_str()),
            Self::Presentation(msg) => Some(msg.thread.thid.as_str()),
            Self::PresentationAck(msg) => Some(msg.thread.thid.as_str()),
            Self::ProblemReport(msg) => msg.thread.as_ref().map(|t| t.thid.as_str()),
        }
    }

    /// Encode as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let envelope = Envelope::peek(raw)?;
        if !is_known_type(&envelope.message_type) {
            return Err(ProtocolError::UnknownMessageType(envelope.message_type));
        }
        Ok(serde_json::from_str(raw)?)
    }
}

/// The routing part of a message, readable without decoding the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// `@type` URI
    pub message_type: String,
    /// `~thread.thid`, if present
    pub thread_id: Option<String>,
}

impl Envelope {
    /// Read `@type` and `~thread.thid` from raw JSON.
    pub fn peek(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let message_type = value
            .get("@type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        let thread_id = value
            .get("~thread")
            .and_then(|thread| thread.get("thid"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Ok(Self { message_type, thread_id })
    }
}

fn is_known_type(message_type: &str) -> bool {
    matches!(
        message_type,
        REQUEST_PRESENTATION_TYPE | PRESENTATION_TYPE | PRESENTATION_ACK_TYPE | PROBLEM_REPORT_TYPE
    )
}
