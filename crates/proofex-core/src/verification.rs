//! Presentation verification.
//!
//! Verification happens in two steps. First a structural check that the
//! presentation answers the request at all (every referent present). Then
//! the cryptographic check, delegated to a [`PresentationVerifier`]. Failing
//! either step yields `NotVerified`; only a backend that cannot evaluate the
//! proof is an error.

use std::fmt;

use proofex_proto::{PresentationPayload, ProofRequestData};

use crate::error::VerifierError;

/// Cryptographic verifier backend.
pub trait PresentationVerifier: Send + Sync {
    /// Check `presentation` against the `request` it answers.
    ///
    /// Returns `Ok(false)` for a proof that does not verify.
    ///
    /// # Errors
    ///
    /// Only when the backend cannot evaluate the proof at all (missing ledger
    /// data, unsupported proof format). The exchange then fails.
    fn verify(
        &self,
        request: &ProofRequestData,
        presentation: &PresentationPayload,
    ) -> Result<bool, VerifierError>;
}

/// Why a presentation does not answer its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Requested attribute was not revealed
    MissingAttribute(String),
    /// Requested predicate was not proven
    MissingPredicate(String),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute(referent) => write!(f, "attribute {referent} not revealed"),
            Self::MissingPredicate(referent) => write!(f, "predicate {referent} not proven"),
        }
    }
}

/// Check that every requested referent is answered.
pub fn check_answers_request(
    request: &ProofRequestData,
    presentation: &PresentationPayload,
) -> Result<(), Mismatch> {
    let answered = &presentation.requested_proof;

    if let Some(referent) =
        request.requested_attributes.keys().find(|r| !answered.revealed_attrs.contains_key(*r))
    {
        return Err(Mismatch::MissingAttribute(referent.clone()));
    }

    if let Some(referent) =
        request.requested_predicates.keys().find(|r| !answered.predicates.contains_key(*r))
    {
        return Err(Mismatch::MissingPredicate(referent.clone()));
    }

    Ok(())
}
