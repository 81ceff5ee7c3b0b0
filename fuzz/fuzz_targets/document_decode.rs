//! Fuzz target for durable document decoding.
//!
//! Arbitrary bytes, read as JSON text and as CBOR, must either be rejected or
//! decode to a machine that re-encodes to the same document.

#![no_main]

use libfuzzer_sys::fuzz_target;
use proofex_core::{SerializedDocument, codec};

fn check(document: &SerializedDocument) {
    let Ok(sm) = codec::decode(document) else {
        return;
    };
    let reencoded = codec::encode(&sm).expect("decoded machine re-encodes");
    let again = codec::decode(&reencoded).expect("re-encoded document decodes");
    assert_eq!(again, sm);
}

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(document) = SerializedDocument::from_json_str(text) {
            check(&document);
        }
    }
    if let Ok(document) = SerializedDocument::from_cbor(data) {
        check(&document);
    }
});
