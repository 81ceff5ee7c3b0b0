//! Presentation payload types.
//!
//! These types describe what the prover disclosed. The cryptographic proof
//! itself stays an opaque JSON value at this layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A revealed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttr {
    /// Index into the proof's sub-proofs
    pub sub_proof_index: u32,
    /// Value as issued
    pub raw: String,
    /// Integer encoding the signature covers
    pub encoded: String,
}

/// Reference to the sub-proof that satisfies a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateProof {
    /// Index into the proof's sub-proofs
    pub sub_proof_index: u32,
}

/// Mapping from request referents to disclosed data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedProof {
    /// Revealed attributes by referent
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttr>,
    /// Satisfied predicates by referent
    #[serde(default)]
    pub predicates: BTreeMap<String, PredicateProof>,
}

/// Ledger identifiers of a credential used in the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// Schema identifier
    pub schema_id: String,
    /// Credential definition identifier
    pub cred_def_id: String,
    /// Revocation registry, if the credential is revocable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<String>,
    /// Revocation timestamp the non-revocation proof was built against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// The prover's answer to a proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationPayload {
    /// What was disclosed, keyed by request referent
    pub requested_proof: RequestedProof,
    /// Cryptographic proof, interpreted only by the verifier backend
    pub proof: serde_json::Value,
    /// Credentials the proof was built from
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
}

impl PresentationPayload {
    /// Revealed raw value for a referent.
    pub fn revealed(&self, referent: &str) -> Option<&str> {
        self.requested_proof.revealed_attrs.get(referent).map(|attr| attr.raw.as_str())
    }
}
