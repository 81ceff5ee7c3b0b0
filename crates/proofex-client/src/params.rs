//! Creation parameters.

use proofex_core::{Result, VerifierError};
use proofex_proto::{AttrSpec, NonRevokedInterval, PredSpec, ProofRequestData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VerifierConfig;

/// Parameters for creating a proof exchange.
///
/// Required fields are `Option`s so that "missing" is representable and
/// rejected with `InvalidOption` rather than being impossible to express.
/// Missing `requested_predicates` means no predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProofCreateParams {
    /// Caller correlation id
    #[serde(default, alias = "sourceId")]
    pub source_id: Option<String>,
    /// Attributes to disclose
    #[serde(default, alias = "requestedAttrs", alias = "attrs")]
    pub requested_attrs: Option<Vec<AttrSpec>>,
    /// Predicates to prove
    #[serde(default, alias = "requestedPredicates", alias = "preds")]
    pub requested_predicates: Option<Vec<PredSpec>>,
    /// Label of the proof request
    #[serde(default)]
    pub name: Option<String>,
    /// Revocation window for the whole request
    #[serde(default, alias = "revocationInterval")]
    pub non_revoked: Option<NonRevokedInterval>,
    /// Note shown to the prover
    #[serde(default)]
    pub comment: Option<String>,
}

impl ProofCreateParams {
    /// Parameters with the two required strings set.
    pub fn new(source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { source_id: Some(source_id.into()), name: Some(name.into()), ..Self::default() }
    }

    /// Set requested attributes.
    #[must_use]
    pub fn attrs(mut self, attrs: Vec<AttrSpec>) -> Self {
        self.requested_attrs = Some(attrs);
        self
    }

    /// Set requested predicates.
    #[must_use]
    pub fn predicates(mut self, predicates: Vec<PredSpec>) -> Self {
        self.requested_predicates = Some(predicates);
        self
    }

    /// Parse JSON parameters.
    ///
    /// # Errors
    ///
    /// `InvalidJson` on malformed input, unknown fields, or an attribute or
    /// restriction that does not match its schema.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| VerifierError::InvalidJson(err.to_string()))
    }

    /// Check required fields and build the request data.
    ///
    /// Nothing is allocated before this succeeds.
    pub(crate) fn into_request(self, config: &VerifierConfig) -> Result<(String, ProofRequestData)> {
        let source_id = required("source_id", self.source_id)?;
        let attrs = self
            .requested_attrs
            .ok_or_else(|| invalid_option("requested_attrs is missing"))?;
        let predicates = self.requested_predicates.unwrap_or_default();
        let name = required("name", self.name)?;

        if attrs.is_empty() && predicates.is_empty() {
            return Err(invalid_option("request asks for no attributes and no predicates"));
        }
        if attrs.is_empty() && !config.allow_empty_requested_attrs {
            return Err(invalid_option("requested_attrs is empty"));
        }
        if let Some(attr) = attrs.iter().find(|attr| attr.name.trim().is_empty()) {
            return Err(invalid_option(format!("requested attribute has empty name: {attr:?}")));
        }
        if let Some(pred) = predicates.iter().find(|pred| pred.name.trim().is_empty()) {
            return Err(invalid_option(format!("requested predicate has empty name: {pred:?}")));
        }

        let request = ProofRequestData::new(name)
            .set_version(config.proof_request_version.clone())
            .set_requested_attributes(attrs)
            .set_requested_predicates(predicates)
            .set_non_revoked(self.non_revoked.or(config.default_non_revoked));

        Ok((source_id, request))
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(invalid_option(format!("{field} is empty"))),
        None => Err(invalid_option(format!("{field} is missing"))),
    }
}

fn invalid_option(reason: impl Into<String>) -> VerifierError {
    let reason = reason.into();
    debug!(%reason, "rejecting creation parameters");
    VerifierError::InvalidOption(reason)
}
