//! Proof request data.
//!
//! A proof request names the attributes the verifier wants disclosed and the
//! predicates (range claims over integer attributes) it wants proven. Each
//! entry is keyed by a referent, which the prover echoes back in its
//! presentation so the two can be matched without relying on ordering.
//!
//! # Referents
//!
//! Referents are assigned from caller order: the i-th requested attribute is
//! `attribute_<i>`, the i-th predicate is `predicate_<i>`. Both maps are
//! `BTreeMap`s so the JSON encoding is deterministic, which the durable
//! document's round-trip guarantee depends on.

use std::{collections::BTreeMap, fmt};

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Default `version` field of a proof request.
pub const DEFAULT_PROOF_REQUEST_VERSION: &str = "1.0";

/// Filter on which credentials may satisfy a requested attribute or predicate.
///
/// All present fields must match. Unknown fields are rejected so a typo never
/// silently widens the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Restriction {
    /// Exact schema identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    /// DID that published the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    /// Schema name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// Schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// DID of the credential issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    /// Exact credential definition identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
}

/// Time window in which the credential must not have been revoked.
///
/// Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NonRevokedInterval {
    /// Start of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// End of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

/// A requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttrSpec {
    /// Attribute name as it appears in the credential
    pub name: String,
    /// Credentials allowed to satisfy this attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Restriction>>,
    /// Per-attribute revocation window, overriding the request-level one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl AttrSpec {
    /// Unrestricted attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), restrictions: None, non_revoked: None }
    }

    /// Attach restrictions.
    #[must_use]
    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = Some(restrictions);
        self
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// `>`
    #[serde(rename = ">")]
    Greater,
    /// `<=`
    #[serde(rename = "<=")]
    LessOrEqual,
    /// `<`
    #[serde(rename = "<")]
    Less,
}

impl Comparator {
    /// Evaluate `value <op> threshold`.
    pub fn holds(self, value: i64, threshold: i64) -> bool {
        match self {
            Self::GreaterOrEqual => value >= threshold,
            Self::Greater => value > threshold,
            Self::LessOrEqual => value <= threshold,
            Self::Less => value < threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
        };
        f.write_str(symbol)
    }
}

/// A requested predicate, e.g. `age >= 18`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredSpec {
    /// Attribute the predicate is evaluated over
    pub name: String,
    /// Comparison operator
    pub p_type: Comparator,
    /// Threshold
    pub p_value: i64,
    /// Credentials allowed to satisfy this predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Restriction>>,
    /// Per-predicate revocation window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredSpec {
    /// Unrestricted predicate.
    pub fn new(name: impl Into<String>, p_type: Comparator, p_value: i64) -> Self {
        Self { name: name.into(), p_type, p_value, restrictions: None, non_revoked: None }
    }
}

/// The body of a presentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestData {
    /// Freshness nonce, decimal digits
    pub nonce: String,
    /// Human readable label
    pub name: String,
    /// Proof request format version
    pub version: String,
    /// Requested attributes by referent
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, AttrSpec>,
    /// Requested predicates by referent
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, PredSpec>,
    /// Request-level revocation window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequestData {
    /// Empty request with a fresh random nonce.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_nonce(name, generate_nonce())
    }

    /// Empty request with a caller supplied nonce.
    pub fn with_nonce(name: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            name: name.into(),
            version: DEFAULT_PROOF_REQUEST_VERSION.to_string(),
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
            non_revoked: None,
        }
    }

    /// Set the request format version.
    #[must_use]
    pub fn set_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replace requested attributes, assigning referents from caller order.
    #[must_use]
    pub fn set_requested_attributes(mut self, attrs: Vec<AttrSpec>) -> Self {
        self.requested_attributes = attrs
            .into_iter()
            .enumerate()
            .map(|(i, attr)| (format!("attribute_{i}"), attr))
            .collect();
        self
    }

    /// Replace requested predicates, assigning referents from caller order.
    #[must_use]
    pub fn set_requested_predicates(mut self, preds: Vec<PredSpec>) -> Self {
        self.requested_predicates = preds
            .into_iter()
            .enumerate()
            .map(|(i, pred)| (format!("predicate_{i}"), pred))
            .collect();
        self
    }

    /// Set the request-level revocation window.
    #[must_use]
    pub fn set_non_revoked(mut self, interval: Option<NonRevokedInterval>) -> Self {
        self.non_revoked = interval;
        self
    }

    /// True if neither attributes nor predicates are requested.
    pub fn is_empty(&self) -> bool {
        self.requested_attributes.is_empty() && self.requested_predicates.is_empty()
    }
}

/// Random 80-bit nonce rendered as decimal digits.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes[..10]);
    u128::from_le_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn every_spec_gets_one_referent(names in proptest::collection::vec("[a-z]{1,8}", 0..16)) {
            let attrs = names.iter().map(AttrSpec::new).collect();
            let data = ProofRequestData::with_nonce("proof-req", "1").set_requested_attributes(attrs);

            prop_assert_eq!(data.requested_attributes.len(), names.len());
            for (i, name) in names.iter().enumerate() {
                prop_assert_eq!(&data.requested_attributes[&format!("attribute_{i}")].name, name);
            }
        }
    }

    #[test]
    fn referents_follow_caller_order() {
        let data = ProofRequestData::with_nonce("proof-req", "1")
            .set_requested_attributes(vec![AttrSpec::new("name"), AttrSpec::new("age")])
            .set_requested_predicates(vec![PredSpec::new("age", Comparator::GreaterOrEqual, 18)]);

        assert_eq!(data.requested_attributes["attribute_0"].name, "name");
        assert_eq!(data.requested_attributes["attribute_1"].name, "age");
        assert_eq!(data.requested_predicates["predicate_0"].p_value, 18);
        assert!(!data.is_empty());
    }

    #[test]
    fn restriction_rejects_unknown_fields() {
        let result = serde_json::from_str::<Restriction>(r#"{"invalid":"invalid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn attr_without_name_is_rejected() {
        let result = serde_json::from_str::<AttrSpec>(r#"{"invalid":"invalid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn comparator_uses_symbols_on_the_wire() {
        let pred = PredSpec::new("age", Comparator::Less, 65);
        let json = serde_json::to_value(&pred).unwrap();
        assert_eq!(json["p_type"], "<");
        assert!(Comparator::Less.holds(30, 65));
        assert!(!Comparator::Greater.holds(65, 65));
    }

    #[test]
    fn nonce_is_decimal() {
        let nonce = generate_nonce();
        assert!(!nonce.is_empty());
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn encoded_request_snapshot() {
        let data = ProofRequestData::with_nonce("proof-req", "42")
            .set_requested_attributes(vec![AttrSpec::new("age")]);
        let json = serde_json::to_string_pretty(&data).unwrap();

        insta::assert_snapshot!(json, @r#"
        {
          "nonce": "42",
          "name": "proof-req",
          "version": "1.0",
          "requested_attributes": {
            "attribute_0": {
              "name": "age"
            }
          },
          "requested_predicates": {}
        }
        "#);
    }
}
