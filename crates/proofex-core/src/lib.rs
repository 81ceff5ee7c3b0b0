//! Proof exchange core logic
//!
//! Pure verifier-side logic for the present-proof protocol, decoupled from
//! transport and cryptography.
//!
//! # Architecture
//!
//! The verifier state machine never performs I/O. Transitions return
//! declarative [`machine::VerifierAction`]s (messages to send) and the caller
//! executes them against a [`transport::Connections`] implementation. The
//! only external computation the machine consults directly is the
//! [`verification::PresentationVerifier`] it is handed when a presentation
//! arrives.
//!
//! Live machines are owned by a [`registry::HandleRegistry`], which hands out
//! generation-checked opaque handles and serializes access per handle.
//!
//! # Components
//!
//! - [`machine`]: Verifier state machine (request, presentation, outcome)
//! - [`state`]: Public state and verification-result codes
//! - [`adapter`]: Inbound/outbound message translation
//! - [`codec`]: Versioned durable document
//! - [`registry`]: Opaque handle registry
//! - [`transport`]: Connection collaborator abstraction
//! - [`verification`]: Presentation verifier abstraction
//! - [`error`]: Error taxonomy

pub mod adapter;
pub mod codec;
pub mod error;
pub mod machine;
pub mod registry;
pub mod state;
pub mod transport;
pub mod verification;

pub use codec::SerializedDocument;
pub use error::{ErrorKind, Result, VerifierError};
pub use machine::{VerifierAction, VerifierEvent, VerifierSm};
pub use registry::{Handle, HandleError, HandleRegistry};
pub use state::{ProofState, VerificationResult};
pub use transport::{ConnectionHandle, Connections, InboundMessage, TransportError};
pub use verification::PresentationVerifier;
