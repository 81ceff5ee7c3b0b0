//! Scripted prover.
//!
//! Answers a proof request from a fixed set of attribute values. The "proof"
//! is a SHA-256 digest over the request nonce and the disclosed values, which
//! [`crate::DigestVerifier`] recomputes. It binds the answer to the request
//! without any real cryptography.

use std::collections::BTreeMap;

use proofex_proto::{
    PredicateProof, PresentationMessage, PresentationPayload, ProblemReport, ProofRequestData,
    ProtocolError, ProtocolMessage, RequestedProof, RevealedAttr,
};
use sha2::{Digest, Sha256};

/// Problem code the prover sends when declining.
pub const DECLINED: &str = "request-declined";

/// Digest binding `requested_proof` to the request `nonce`.
pub fn proof_digest(nonce: &str, requested_proof: &RequestedProof) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update([0u8]);
    // BTreeMap fields: the encoding is canonical
    hasher.update(serde_json::to_vec(requested_proof).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// Prover holding attribute values by name.
#[derive(Debug, Clone, Default)]
pub struct SimProver {
    attrs: BTreeMap<String, String>,
    tamper: bool,
}

impl SimProver {
    /// Prover with no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `value` for attribute `name`.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Produce proofs whose digest does not match what they disclose.
    #[must_use]
    pub fn tampered(mut self) -> Self {
        self.tamper = true;
        self
    }

    /// Build the presentation payload answering `request`.
    ///
    /// Attributes the prover does not hold are left out, as are predicates
    /// that do not hold over its values.
    pub fn answer(&self, request: &ProofRequestData) -> PresentationPayload {
        let mut requested_proof = RequestedProof::default();

        for (referent, spec) in &request.requested_attributes {
            if let Some(value) = self.attrs.get(&spec.name) {
                requested_proof.revealed_attrs.insert(
                    referent.clone(),
                    RevealedAttr { sub_proof_index: 0, raw: value.clone(), encoded: encode(value) },
                );
            }
        }

        for (referent, spec) in &request.requested_predicates {
            let holds = self
                .attrs
                .get(&spec.name)
                .and_then(|value| value.parse::<i64>().ok())
                .is_some_and(|value| spec.p_type.holds(value, spec.p_value));
            if holds {
                requested_proof
                    .predicates
                    .insert(referent.clone(), PredicateProof { sub_proof_index: 0 });
            }
        }

        let mut digest = proof_digest(&request.nonce, &requested_proof);
        if self.tamper {
            digest = proof_digest("tampered", &requested_proof);
        }

        PresentationPayload {
            requested_proof,
            proof: serde_json::json!({ "digest": digest }),
            identifiers: vec![],
        }
    }

    /// Answer a wire-encoded request with a wire-encoded presentation.
    ///
    /// # Errors
    ///
    /// If `request` is not a request-presentation message.
    pub fn present(&self, request: &str) -> Result<String, ProtocolError> {
        let message = match ProtocolMessage::from_json(request)? {
            ProtocolMessage::RequestPresentation(message) => message,
            other => return Err(ProtocolError::UnknownMessageType(other.type_uri().to_string())),
        };
        let payload = self.answer(&message.request_data()?);
        let presentation = PresentationMessage::new(message.id.as_str(), &payload)?;
        ProtocolMessage::Presentation(presentation).to_json()
    }

    /// Decline a wire-encoded request with a problem report on its thread.
    ///
    /// # Errors
    ///
    /// If `request` is not a decodable message.
    pub fn decline(&self, request: &str) -> Result<String, ProtocolError> {
        let message = ProtocolMessage::from_json(request)?;
        let report = ProblemReport::new(
            DECLINED,
            Some("prover declined the request".to_string()),
            message.id().as_str(),
        );
        ProtocolMessage::ProblemReport(report).to_json()
    }
}

// Numeric values encode as themselves, anything else as a digest.
fn encode(value: &str) -> String {
    if value.parse::<i64>().is_ok() {
        return value.to_string();
    }
    hex::encode(Sha256::digest(value.as_bytes()))
}
