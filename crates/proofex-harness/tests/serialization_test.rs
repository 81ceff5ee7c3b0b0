//! Suspend/resume through the durable document.
//!
//! An exchange is serialized, released, and restored under a fresh handle at
//! each point of its lifecycle. The restored exchange must behave exactly as
//! the original would have, except that it has no remembered connection.

use std::sync::Arc;

use proofex_client::{
    ErrorKind, ProofCreateParams, ProofHandle, ProofState, SerializedDocument,
    VerificationResult, Verifier,
};
use proofex_harness::{DigestVerifier, SimConnections, SimProver};
use proofex_proto::AttrSpec;
use serde_json::json;

type TestVerifier = Verifier<SimConnections, DigestVerifier>;

fn setup() -> (Arc<SimConnections>, TestVerifier) {
    let connections = Arc::new(SimConnections::new());
    let verifier = Verifier::new(Arc::clone(&connections), Arc::new(DigestVerifier));
    (connections, verifier)
}

fn params() -> ProofCreateParams {
    ProofCreateParams::new("1", "proof-req").attrs(vec![AttrSpec::new("age")])
}

async fn suspend(verifier: &TestVerifier, handle: ProofHandle) -> ProofHandle {
    let document = verifier.serialize(handle).await.unwrap();
    verifier.release(handle).unwrap();
    verifier.deserialize(&document).unwrap()
}

#[tokio::test]
async fn document_carries_source_id() {
    let (_, verifier) = setup();
    let handle = verifier.create(params()).unwrap();
    let document = verifier.serialize(handle).await.unwrap();

    assert_eq!(document.as_value()["version"], "2.0");
    assert_eq!(document.as_value()["data"]["verifier_sm"]["source_id"], "1");
}

#[tokio::test]
async fn serialize_unknown_handle() {
    let (_, verifier) = setup();
    let err = verifier.serialize(ProofHandle::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidProofHandle);
}

#[tokio::test]
async fn restored_document_reserializes_identically() {
    let (_, verifier) = setup();
    let first = verifier.create(params()).unwrap();
    let document = verifier.serialize(first).await.unwrap();

    let second = verifier.deserialize(&document).unwrap();
    assert_ne!(first, second);
    assert_eq!(verifier.serialize(second).await.unwrap(), document);
}

#[tokio::test]
async fn restored_exchange_keeps_its_thread() {
    let (connections, verifier) = setup();
    let connection = connections.open_ready();
    let handle = verifier.create(params()).unwrap();
    verifier.request_proof(handle, connection).await.unwrap();
    let request = verifier.get_proof_request_message(handle).await.unwrap();

    let restored = suspend(&verifier, handle).await;
    assert_eq!(verifier.get_state(restored).await, ProofState::OfferSent);
    assert_eq!(verifier.get_proof_request_message(restored).await.unwrap(), request);

    // no remembered connection: polling is a no-op until one is given
    let presentation = SimProver::new().with_attr("age", "30").present(&request).unwrap();
    connections.deliver(connection, presentation);
    assert_eq!(verifier.update_state(restored).await.unwrap(), ProofState::OfferSent);

    let state = verifier.update_state_with_connection(restored, connection).await.unwrap();
    assert_eq!(state, ProofState::Accepted);
    assert_eq!(
        verifier.get_verification_result(restored).await.unwrap(),
        VerificationResult::Verified
    );
}

#[tokio::test]
async fn accepted_exchange_survives_restore() {
    let (_, verifier) = setup();
    let handle = verifier.create(params()).unwrap();
    let request = verifier.get_proof_request_message(handle).await.unwrap();
    let presentation = SimProver::new().with_attr("age", "30").present(&request).unwrap();
    verifier.update_state_with_message(handle, &presentation).await.unwrap();

    let before = verifier.serialize(handle).await.unwrap();
    let restored = suspend(&verifier, handle).await;
    assert_eq!(verifier.serialize(restored).await.unwrap(), before);
    assert_eq!(
        verifier.get_verification_result(restored).await.unwrap(),
        VerificationResult::Verified
    );
}

#[tokio::test]
async fn incorrect_documents_are_unknown_errors() {
    let (_, verifier) = setup();
    let cases = [
        json!({ "source_id": "Invalid" }),
        json!({ "name": "Invalid", "requested_attrs": "Invalid", "source_id": "Invalid" }),
        json!({ "version": "1.0", "data": {} }),
        json!({ "version": "2.0", "data": { "verifier_sm": { "source_id": "1" } } }),
    ];

    for case in cases {
        let err = verifier.deserialize(&SerializedDocument::from_value(case)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownError);
    }
    assert_eq!(verifier.live_exchanges(), 0);
}

#[tokio::test]
async fn malformed_json_text_is_invalid_json() {
    let err = SerializedDocument::from_json_str("{\"version\": ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidJson);
}

#[tokio::test]
async fn json_text_and_cbor_forms_restore() {
    let (_, verifier) = setup();
    let handle = verifier.create(params()).unwrap();
    let document = verifier.serialize(handle).await.unwrap();

    let from_text = SerializedDocument::from_json_str(&document.to_json_string()).unwrap();
    let from_cbor = SerializedDocument::from_cbor(&document.to_cbor().unwrap()).unwrap();

    for restored in [from_text, from_cbor] {
        let handle = verifier.deserialize(&restored).unwrap();
        assert_eq!(verifier.serialize(handle).await.unwrap(), document);
    }
}
