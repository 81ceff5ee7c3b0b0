//! Wire format for the present-proof protocol, verifier side.
//!
//! Messages are JSON objects discriminated by their `@type` URI and linked
//! into a conversation with the `~thread` decorator. Bulky bodies (the proof
//! request and the presentation itself) travel as base64 attachments so the
//! envelope stays small and can be routed without decoding them.
//!
//! Nothing in this crate performs I/O or cryptography. The `proof` member of
//! a [`PresentationPayload`] is opaque here and only interpreted by whatever
//! verifier the caller plugs in at a higher layer.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attachment;
pub mod errors;
pub mod message;
pub mod presentation;
pub mod request;

pub use attachment::Attachment;
pub use errors::{ProtocolError, Result};
pub use message::{
    AckStatus, Envelope, MessageId, PresentationAck, PresentationMessage, ProblemDescription,
    ProblemReport, ProtocolMessage, RequestPresentation, Thread,
};
pub use presentation::{
    Identifier, PredicateProof, PresentationPayload, RequestedProof, RevealedAttr,
};
pub use request::{
    AttrSpec, Comparator, NonRevokedInterval, PredSpec, ProofRequestData, Restriction,
    generate_nonce,
};
