//! Registry entry for one proof exchange.

use proofex_core::{ConnectionHandle, VerifierSm};

/// A live exchange: the state machine plus the connection it last used.
///
/// The connection is remembered so polling needs no connection argument. It
/// is a lookup key only, re-resolved on every use, and is not part of the
/// durable document: a deserialized exchange starts without one.
#[derive(Debug, Clone)]
pub(crate) struct ProofExchange {
    pub(crate) sm: VerifierSm,
    pub(crate) connection: Option<ConnectionHandle>,
}

impl ProofExchange {
    pub(crate) fn new(sm: VerifierSm) -> Self {
        Self { sm, connection: None }
    }
}
