//! Verifier facade for present-proof exchanges
//!
//! The operation surface callers use to run proof exchanges: create an
//! exchange, send its request over a connection, drive it with polled or
//! supplied messages, read the result, and suspend/resume it through a
//! durable document.
//!
//! Exchanges are addressed by opaque [`ProofHandle`]s. Inputs are validated
//! before anything is allocated or mutated, and every failure carries a
//! stable [`ErrorKind`].
//!
//! # Components
//!
//! - [`Verifier`]: The operation surface
//! - [`VerifierConfig`]: Behaviour switches
//! - [`ProofCreateParams`]: Creation parameters and their validation

mod config;
mod exchange;
mod params;
mod verifier;

pub use config::VerifierConfig;
pub use params::ProofCreateParams;
pub use proofex_core::{
    ConnectionHandle, Connections, ErrorKind, PresentationVerifier, ProofState, Result,
    SerializedDocument, VerificationResult, VerifierError,
};
pub use verifier::{ProofHandle, ProofResult, Verifier};
