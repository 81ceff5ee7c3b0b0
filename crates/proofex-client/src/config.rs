//! Verifier configuration.

use proofex_core::{Result, VerifierError};
use proofex_proto::{NonRevokedInterval, request::DEFAULT_PROOF_REQUEST_VERSION};
use serde::{Deserialize, Serialize};

/// Verifier configuration
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Accept a request that asks only for predicates (empty attribute list).
    ///
    /// A request asking for nothing at all is rejected regardless.
    pub allow_empty_requested_attrs: bool,
    /// `version` written into every proof request
    pub proof_request_version: String,
    /// Revocation window used when creation parameters carry none
    pub default_non_revoked: Option<NonRevokedInterval>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            allow_empty_requested_attrs: false,
            proof_request_version: DEFAULT_PROOF_REQUEST_VERSION.to_string(),
            default_non_revoked: None,
        }
    }
}

impl VerifierConfig {
    /// Parse a JSON config.
    ///
    /// # Errors
    ///
    /// `InvalidJson` on malformed input or unknown fields.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| VerifierError::InvalidJson(err.to_string()))
    }
}
