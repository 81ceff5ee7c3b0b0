//! Serialization codec.
//!
//! A proof exchange is suspended as a versioned JSON document:
//!
//! ```json
//! {
//!   "version": "2.0",
//!   "data": {
//!     "verifier_sm": {
//!       "source_id": "...",
//!       "request_data": { ... },
//!       "request": { ... },
//!       "state": "Initial" | { "Accepted": { "presentation": ..., "result": 1 } } | ...
//!     }
//!   }
//! }
//! ```
//!
//! Encoding is a pure function of the machine. Decoding either yields a
//! machine that re-encodes to a deep-equal document or fails; it never
//! produces a partially populated exchange. Connections are not part of the
//! document.
//!
//! The same document can be stored as CBOR for compactness.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Result, VerifierError},
    machine::VerifierSm,
};

/// Current document version.
pub const DOCUMENT_VERSION: &str = "2.0";

/// Durable representation of a proof exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedDocument(Value);

#[derive(Serialize, Deserialize)]
struct VersionedDocument {
    version: String,
    data: DocumentData,
}

#[derive(Serialize, Deserialize)]
struct DocumentData {
    verifier_sm: VerifierSm,
}

impl SerializedDocument {
    /// Wrap an arbitrary JSON value. Nothing is validated until decode.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Parse a JSON string.
    ///
    /// # Errors
    ///
    /// `InvalidJson` if the string is not JSON at all.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|err| VerifierError::InvalidJson(err.to_string()))
    }

    /// Render as a JSON string.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    /// Render as CBOR bytes.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the CBOR writer fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&self.0, &mut bytes)
            .map_err(|err| VerifierError::InvalidDocument(err.to_string()))?;
        Ok(bytes)
    }

    /// Read CBOR bytes written by [`Self::to_cbor`].
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the bytes are not a CBOR document.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes)
            .map(Self)
            .map_err(|err| VerifierError::InvalidDocument(err.to_string()))
    }
}

/// Encode a machine as a versioned document.
///
/// # Errors
///
/// `InvalidDocument` only if serde rejects the machine, which the types make
/// impossible in practice.
pub fn encode(sm: &VerifierSm) -> Result<SerializedDocument> {
    let document = VersionedDocument {
        version: DOCUMENT_VERSION.to_string(),
        data: DocumentData { verifier_sm: sm.clone() },
    };
    serde_json::to_value(document)
        .map(SerializedDocument)
        .map_err(|err| VerifierError::InvalidDocument(err.to_string()))
}

/// Decode a versioned document.
///
/// # Errors
///
/// `InvalidDocument` if the version is missing or unknown, required members
/// are missing, or the decoded machine violates its invariants.
pub fn decode(document: &SerializedDocument) -> Result<VerifierSm> {
    let version = document
        .0
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| VerifierError::InvalidDocument("missing version".to_string()))?;

    if version != DOCUMENT_VERSION {
        return Err(VerifierError::InvalidDocument(format!("unsupported version {version}")));
    }

    let decoded: VersionedDocument = serde_json::from_value(document.0.clone())
        .map_err(|err| VerifierError::InvalidDocument(err.to_string()))?;

    let sm = decoded.data.verifier_sm;
    sm.validate()?;
    Ok(sm)
}
