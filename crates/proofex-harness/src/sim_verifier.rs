//! Verifier backends for tests.

use proofex_core::{PresentationVerifier, VerifierError};
use proofex_proto::{PresentationPayload, ProofRequestData};

use crate::sim_prover::proof_digest;

/// Accepts proofs produced by [`crate::SimProver`] for the same request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl PresentationVerifier for DigestVerifier {
    fn verify(
        &self,
        request: &ProofRequestData,
        presentation: &PresentationPayload,
    ) -> Result<bool, VerifierError> {
        // a stripped digest is a tampered proof, not an evaluation failure
        let Some(claimed) = presentation.proof.get("digest").and_then(serde_json::Value::as_str)
        else {
            return Ok(false);
        };
        Ok(claimed == proof_digest(&request.nonce, &presentation.requested_proof))
    }
}

/// Backend that can never evaluate a proof.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingVerifier;

impl PresentationVerifier for FailingVerifier {
    fn verify(
        &self,
        _request: &ProofRequestData,
        _presentation: &PresentationPayload,
    ) -> Result<bool, VerifierError> {
        Err(VerifierError::Backend("ledger unavailable".to_string()))
    }
}
