//! Fuzz target for inbound message decoding.
//!
//! No input may panic the adapter. Whatever it yields must leave a fresh
//! machine in a valid state after handling.

#![no_main]

use libfuzzer_sys::fuzz_target;
use proofex_core::{
    PresentationVerifier, Result, VerifierEvent, VerifierSm,
    adapter::{self, Inbound},
};
use proofex_proto::{AttrSpec, PresentationPayload, ProofRequestData, Thread};

struct AcceptAll;

impl PresentationVerifier for AcceptAll {
    fn verify(&self, _: &ProofRequestData, _: &PresentationPayload) -> Result<bool> {
        Ok(true)
    }
}

fn on_thread(event: VerifierEvent, thid: &str) -> VerifierEvent {
    match event {
        VerifierEvent::PresentationReceived(mut message) => {
            message.thread = Thread::new(thid);
            VerifierEvent::PresentationReceived(message)
        },
        VerifierEvent::MalformedPresentation { reason, .. } => {
            VerifierEvent::MalformedPresentation { thread_id: thid.to_string(), reason }
        },
        VerifierEvent::ProblemReportReceived(mut report) => {
            report.thread = Some(Thread::new(thid));
            VerifierEvent::ProblemReportReceived(report)
        },
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let Inbound::Event(event) = adapter::decode_inbound(raw) else {
        return;
    };

    let request = ProofRequestData::with_nonce("fuzz", "1")
        .set_requested_attributes(vec![AttrSpec::new("age")]);
    let mut sm = VerifierSm::new("fuzz", request, None).expect("machine builds");
    sm.send_request().expect("fresh machine sends");

    // put the event on the machine's thread so it drives a real transition
    let event = on_thread(event, sm.thread_id());
    assert!(sm.can_handle(&event));
    let _ = sm.handle(event, &AcceptAll);
    sm.validate().expect("machine stays valid");
});
