//! Error taxonomy for proof exchange operations.
//!
//! Every [`VerifierError`] maps to one stable [`ErrorKind`] with a numeric
//! code. Callers branch on the kind; the message is for humans.
//!
//! Verification failure is not an error. A presentation that does not verify
//! is a normal transition to `Accepted` with `NotVerified`.

use proofex_proto::ProtocolError;
use thiserror::Error;

use crate::{
    registry::HandleError,
    state::ProofState,
    transport::{ConnectionHandle, TransportError},
};

/// Result alias for proof exchange operations.
pub type Result<T> = std::result::Result<T, VerifierError>;

/// Stable error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorKind {
    /// Durable document is structurally invalid or incomplete
    UnknownError = 1001,
    /// Connection handle does not resolve to a ready connection
    InvalidConnectionHandle = 1003,
    /// Requested data is not available yet
    NotReady = 1005,
    /// Required creation field missing or empty
    InvalidOption = 1007,
    /// Malformed structured input
    InvalidJson = 1016,
    /// Proof handle does not resolve to a live exchange
    InvalidProofHandle = 1017,
    /// Operation not valid in the current state
    InvalidState = 1081,
}

impl ErrorKind {
    /// Numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Errors raised by proof exchange operations.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Required creation field missing or empty
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Handle does not resolve to a live exchange
    #[error("invalid proof handle: {0}")]
    InvalidProofHandle(u64),

    /// Connection handle does not resolve to a ready connection
    #[error("invalid connection handle: {0}")]
    InvalidConnectionHandle(ConnectionHandle),

    /// Malformed structured input
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// Supplied message belongs to another exchange
    #[error("message is on thread {found}, exchange is on {expected}")]
    ForeignThread {
        /// Thread of the exchange
        expected: String,
        /// Thread the message claimed
        found: String,
    },

    /// Durable document could not be decoded
    #[error("cannot decode proof exchange document: {0}")]
    InvalidDocument(String),

    /// Data requested before the exchange produced it
    #[error("not ready: {0}")]
    NotReady(String),

    /// Operation attempted in a state that does not allow it
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        /// Current public state
        state: ProofState,
        /// Attempted operation
        operation: String,
    },

    /// Connection collaborator failed
    #[error("transport: {0}")]
    Transport(#[source] TransportError),

    /// Verifier backend could not evaluate the proof
    #[error("verification backend: {0}")]
    Backend(String),

    /// Wire encoding failed
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
}

impl VerifierError {
    /// Stable class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOption(_) => ErrorKind::InvalidOption,
            Self::InvalidProofHandle(_) => ErrorKind::InvalidProofHandle,
            Self::InvalidConnectionHandle(_) => ErrorKind::InvalidConnectionHandle,
            Self::InvalidJson(_) | Self::ForeignThread { .. } => ErrorKind::InvalidJson,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Transport(TransportError::UnknownConnection(_) | TransportError::NotReady(_)) => {
                ErrorKind::InvalidConnectionHandle
            },
            Self::Protocol(ProtocolError::InvalidJson(_)) => ErrorKind::InvalidJson,
            Self::InvalidDocument(_)
            | Self::Transport(_)
            | Self::Backend(_)
            | Self::Protocol(_) => ErrorKind::UnknownError,
        }
    }
}

impl From<HandleError> for VerifierError {
    fn from(err: HandleError) -> Self {
        match err {
            HandleError::InvalidHandle(raw) => Self::InvalidProofHandle(raw),
        }
    }
}

impl From<TransportError> for VerifierError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::UnknownConnection(handle) | TransportError::NotReady(handle) => {
                Self::InvalidConnectionHandle(handle)
            },
            other => Self::Transport(other),
        }
    }
}
