//! Public state codes.
//!
//! These are the values callers observe. Internal machine states carry more
//! data (see [`crate::machine`]) but always map onto exactly one
//! [`ProofState`].

use std::fmt;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Protocol state of a proof exchange as seen by callers.
///
/// The numeric codes are stable and part of the external surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum ProofState {
    /// No exchange behind the handle
    None = 0,
    /// Created, request not yet sent
    Initialized = 1,
    /// Request sent, awaiting the presentation
    OfferSent = 2,
    /// Presentation received and verified (either way)
    Accepted = 4,
    /// Protocol failure, e.g. a malformed presentation
    Failed = 5,
    /// Prover declined
    Rejected = 9,
}

impl ProofState {
    /// Numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// True for states no event can leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Failed | Self::Rejected)
    }
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of verifying a presentation.
///
/// `Undefined` is the explicit "not verified yet" value; an accepted exchange
/// always holds `Verified` or `NotVerified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum VerificationResult {
    /// No presentation verified yet
    Undefined = 0,
    /// Presentation answers the request and its proof checks out
    Verified = 1,
    /// Presentation is well-formed but does not verify
    NotVerified = 2,
}

impl VerificationResult {
    /// Numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<bool> for VerificationResult {
    fn from(valid: bool) -> Self {
        if valid { Self::Verified } else { Self::NotVerified }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&ProofState::OfferSent).unwrap(), "2");
        assert_eq!(serde_json::to_string(&VerificationResult::NotVerified).unwrap(), "2");
        let state: ProofState = serde_json::from_str("9").unwrap();
        assert_eq!(state, ProofState::Rejected);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(serde_json::from_str::<ProofState>("3").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!ProofState::Initialized.is_terminal());
        assert!(!ProofState::OfferSent.is_terminal());
        assert!(ProofState::Accepted.is_terminal());
        assert!(ProofState::Failed.is_terminal());
        assert!(ProofState::Rejected.is_terminal());
    }
}
