//! Reference model for model-based testing.
//!
//! [`ModelWorld`] tracks what the verifier facade should report for a
//! sequence of [`Operation`]s, with none of the machinery: no messages, no
//! encoding, no locking. A test applies the same sequence to the real facade
//! and compares [`Outcome`]s step by step.
//!
//! Every exchange in the model gets its own ready connection. Exchange
//! indices in operations are taken modulo the number of created exchanges so
//! any generated sequence is meaningful.

use proofex_core::{ErrorKind, ProofState, VerificationResult};

/// One step applied to both worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create an exchange and open a connection for it
    Create,
    /// Send the request over the exchange's connection
    RequestProof {
        /// Exchange index
        exchange: usize,
    },
    /// Prover queues a presentation on the exchange's connection
    Present {
        /// Exchange index
        exchange: usize,
        /// Whether the proof is honest
        honest: bool,
    },
    /// Prover queues a decline on the exchange's connection
    Decline {
        /// Exchange index
        exchange: usize,
    },
    /// Poll the remembered connection
    Poll {
        /// Exchange index
        exchange: usize,
    },
    /// Serialize, release and deserialize under a new handle
    Suspend {
        /// Exchange index
        exchange: usize,
    },
    /// Release the exchange
    Release {
        /// Exchange index
        exchange: usize,
    },
}

impl Operation {
    /// Exchange index the operation targets, `None` for `Create`.
    pub fn exchange(self) -> Option<usize> {
        match self {
            Self::Create => None,
            Self::RequestProof { exchange }
            | Self::Present { exchange, .. }
            | Self::Decline { exchange }
            | Self::Poll { exchange }
            | Self::Suspend { exchange }
            | Self::Release { exchange } => Some(exchange),
        }
    }
}

/// Observable result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State after the step, with the verification result
    State(ProofState, VerificationResult),
    /// The step failed
    Error(ErrorKind),
    /// Nothing to apply the step to
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queued {
    Presentation { honest: bool },
    Decline,
}

#[derive(Debug, Clone)]
struct ModelExchange {
    state: ProofState,
    result: VerificationResult,
    connected: bool,
    released: bool,
    queue: Vec<Queued>,
}

impl ModelExchange {
    fn outcome(&self) -> Outcome {
        Outcome::State(self.state, self.result)
    }
}

/// Reference model of the verifier facade.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    exchanges: Vec<ModelExchange>,
}

impl ModelWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of exchanges ever created.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// True before the first `Create`.
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Resolve an operation's exchange index, if any exchange exists.
    pub fn index(&self, exchange: usize) -> Option<usize> {
        (!self.exchanges.is_empty()).then(|| exchange % self.exchanges.len())
    }

    /// Apply `op` and return the expected outcome.
    pub fn apply(&mut self, op: Operation) -> Outcome {
        if op == Operation::Create {
            self.exchanges.push(ModelExchange {
                state: ProofState::Initialized,
                result: VerificationResult::Undefined,
                connected: false,
                released: false,
                queue: Vec::new(),
            });
            return Outcome::State(ProofState::Initialized, VerificationResult::Undefined);
        }

        let Some(index) = op.exchange().and_then(|exchange| self.index(exchange)) else {
            return Outcome::Skipped;
        };
        let exchange = &mut self.exchanges[index];

        match op {
            Operation::Create => Outcome::Skipped,
            Operation::RequestProof { .. } => {
                if exchange.released {
                    return Outcome::Error(ErrorKind::InvalidProofHandle);
                }
                if exchange.state != ProofState::Initialized {
                    return Outcome::Error(ErrorKind::InvalidState);
                }
                exchange.state = ProofState::OfferSent;
                exchange.connected = true;
                exchange.outcome()
            },
            Operation::Present { honest, .. } => {
                if exchange.released {
                    return Outcome::Skipped;
                }
                exchange.queue.push(Queued::Presentation { honest });
                exchange.outcome()
            },
            Operation::Decline { .. } => {
                if exchange.released {
                    return Outcome::Skipped;
                }
                exchange.queue.push(Queued::Decline);
                exchange.outcome()
            },
            Operation::Poll { .. } => {
                if exchange.released {
                    return Outcome::State(ProofState::None, VerificationResult::Undefined);
                }
                if exchange.connected && !exchange.state.is_terminal() && !exchange.queue.is_empty()
                {
                    match exchange.queue.remove(0) {
                        Queued::Presentation { honest } => {
                            exchange.state = ProofState::Accepted;
                            exchange.result = VerificationResult::from(honest);
                        },
                        Queued::Decline => exchange.state = ProofState::Rejected,
                    }
                }
                exchange.outcome()
            },
            Operation::Suspend { .. } => {
                if exchange.released {
                    return Outcome::Error(ErrorKind::InvalidProofHandle);
                }
                exchange.connected = false;
                exchange.outcome()
            },
            Operation::Release { .. } => {
                if exchange.released {
                    return Outcome::Error(ErrorKind::InvalidProofHandle);
                }
                exchange.released = true;
                Outcome::State(ProofState::None, VerificationResult::Undefined)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_before_create_are_skipped() {
        let mut world = ModelWorld::new();
        assert_eq!(world.apply(Operation::Poll { exchange: 3 }), Outcome::Skipped);
    }

    #[test]
    fn queued_presentation_waits_for_a_connection() {
        let mut world = ModelWorld::new();
        world.apply(Operation::Create);
        world.apply(Operation::Present { exchange: 0, honest: true });

        let initial = Outcome::State(ProofState::Initialized, VerificationResult::Undefined);
        assert_eq!(world.apply(Operation::Poll { exchange: 0 }), initial);

        world.apply(Operation::RequestProof { exchange: 0 });
        assert_eq!(
            world.apply(Operation::Poll { exchange: 0 }),
            Outcome::State(ProofState::Accepted, VerificationResult::Verified)
        );
    }
}
