//! Simulation harness for proof exchange testing.
//!
//! In-memory implementations of the two collaborators the verifier talks to
//! (connections and the presentation verifier backend), a scripted prover,
//! and a reference model for model-based tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_connections;
pub mod sim_prover;
pub mod sim_verifier;

pub use model::{ModelWorld, Operation, Outcome};
pub use sim_connections::SimConnections;
pub use sim_prover::SimProver;
pub use sim_verifier::{DigestVerifier, FailingVerifier};
