//! Property-based tests.
//!
//! - Creation either fails with `InvalidOption` and allocates nothing, or
//!   yields an `Initialized` exchange whose document round-trips.
//! - Random operation sequences against the facade match [`ModelWorld`].
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld      RealWorld       Compare
//!      (reference)     (facade)        Outcomes
//! ```

use std::sync::Arc;

use proofex_client::{
    ConnectionHandle, ErrorKind, ProofCreateParams, ProofHandle, ProofState, VerificationResult,
    Verifier,
};
use proofex_harness::{DigestVerifier, ModelWorld, Operation, Outcome, SimConnections, SimProver};
use proofex_proto::{AttrSpec, Comparator, PredSpec};
use proptest::prelude::*;

type TestVerifier = Verifier<SimConnections, DigestVerifier>;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

/// Real system wrapper that mirrors ModelWorld's interface.
struct RealWorld {
    connections: Arc<SimConnections>,
    verifier: TestVerifier,
    exchanges: Vec<(ProofHandle, ConnectionHandle)>,
}

impl RealWorld {
    fn new() -> Self {
        let connections = Arc::new(SimConnections::new());
        let verifier = Verifier::new(Arc::clone(&connections), Arc::new(DigestVerifier));
        Self { connections, verifier, exchanges: Vec::new() }
    }

    async fn observe(&self, handle: ProofHandle) -> Outcome {
        let state = self.verifier.get_state(handle).await;
        let result = self
            .verifier
            .get_verification_result(handle)
            .await
            .unwrap_or(VerificationResult::Undefined);
        Outcome::State(state, result)
    }

    async fn apply(&mut self, op: Operation, index: Option<usize>) -> Outcome {
        if op == Operation::Create {
            let params = ProofCreateParams::new("model", "proof-req")
                .attrs(vec![AttrSpec::new("age")]);
            let handle = self.verifier.create(params).unwrap();
            self.exchanges.push((handle, self.connections.open_ready()));
            return self.observe(handle).await;
        }

        let Some(index) = index else {
            return Outcome::Skipped;
        };
        let (handle, connection) = self.exchanges[index];

        match op {
            Operation::Create => Outcome::Skipped,
            Operation::RequestProof { .. } => {
                match self.verifier.request_proof(handle, connection).await {
                    Ok(()) => self.observe(handle).await,
                    Err(err) => Outcome::Error(err.kind()),
                }
            },
            Operation::Present { honest, .. } => {
                let Ok(request) = self.verifier.get_proof_request_message(handle).await else {
                    return Outcome::Skipped;
                };
                let prover = SimProver::new().with_attr("age", "30");
                let prover = if honest { prover } else { prover.tampered() };
                self.connections.deliver(connection, prover.present(&request).unwrap());
                self.observe(handle).await
            },
            Operation::Decline { .. } => {
                let Ok(request) = self.verifier.get_proof_request_message(handle).await else {
                    return Outcome::Skipped;
                };
                let decline = SimProver::new().decline(&request).unwrap();
                self.connections.deliver(connection, decline);
                self.observe(handle).await
            },
            Operation::Poll { .. } => match self.verifier.update_state(handle).await {
                Ok(_) => self.observe(handle).await,
                Err(err) => Outcome::Error(err.kind()),
            },
            Operation::Suspend { .. } => {
                let document = match self.verifier.serialize(handle).await {
                    Ok(document) => document,
                    Err(err) => return Outcome::Error(err.kind()),
                };
                self.verifier.release(handle).unwrap();
                let restored = self.verifier.deserialize(&document).unwrap();
                self.exchanges[index].0 = restored;
                self.observe(restored).await
            },
            Operation::Release { .. } => match self.verifier.release(handle) {
                Ok(()) => self.observe(handle).await,
                Err(err) => Outcome::Error(err.kind()),
            },
        }
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        2 => Just(Operation::Create),
        3 => any::<usize>().prop_map(|exchange| Operation::RequestProof { exchange }),
        2 => (any::<usize>(), any::<bool>())
            .prop_map(|(exchange, honest)| Operation::Present { exchange, honest }),
        1 => any::<usize>().prop_map(|exchange| Operation::Decline { exchange }),
        3 => any::<usize>().prop_map(|exchange| Operation::Poll { exchange }),
        1 => any::<usize>().prop_map(|exchange| Operation::Suspend { exchange }),
        1 => any::<usize>().prop_map(|exchange| Operation::Release { exchange }),
    ]
}

fn attr_names() -> impl Strategy<Value = Option<Vec<String>>> {
    proptest::option::of(proptest::collection::vec("[a-z ]{0,6}", 0..4))
}

fn text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z0-9 ]{0,8}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn facade_matches_model(ops in proptest::collection::vec(operation(), 1..40)) {
        let rt = runtime();
        let mut model = ModelWorld::new();
        let mut real = RealWorld::new();

        for (step, op) in ops.into_iter().enumerate() {
            let index = op.exchange().and_then(|exchange| model.index(exchange));
            let expected = model.apply(op);
            let actual = rt.block_on(real.apply(op, index));
            prop_assert_eq!(actual, expected, "step {} op {:?}", step, op);
        }
    }

    #[test]
    fn create_validates_or_allocates(
        source_id in text(),
        name in text(),
        attrs in attr_names(),
        with_predicate in any::<bool>(),
    ) {
        let rt = runtime();
        let verifier: TestVerifier =
            Verifier::new(Arc::new(SimConnections::new()), Arc::new(DigestVerifier));

        let params = ProofCreateParams {
            source_id: source_id.clone(),
            name: name.clone(),
            requested_attrs: attrs.clone().map(|names| names.into_iter().map(AttrSpec::new).collect()),
            requested_predicates: with_predicate
                .then(|| vec![PredSpec::new("age", Comparator::GreaterOrEqual, 18)]),
            ..ProofCreateParams::default()
        };

        let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
        let valid = !blank(&source_id)
            && !blank(&name)
            && attrs.as_ref().is_some_and(|names| {
                !names.is_empty() && names.iter().all(|n| !n.trim().is_empty())
            });

        match verifier.create(params) {
            Ok(handle) => {
                prop_assert!(valid);
                let document = rt.block_on(verifier.serialize(handle)).unwrap();
                let restored = verifier.deserialize(&document).unwrap();
                prop_assert_eq!(rt.block_on(verifier.get_state(restored)), ProofState::Initialized);
                prop_assert_eq!(rt.block_on(verifier.serialize(restored)).unwrap(), document);
            },
            Err(err) => {
                prop_assert!(!valid);
                prop_assert_eq!(err.kind(), ErrorKind::InvalidOption);
                prop_assert_eq!(verifier.live_exchanges(), 0);
            },
        }
    }
}
