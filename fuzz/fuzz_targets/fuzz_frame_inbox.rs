//! Fuzz target: `FrameInbox`
//!
//! Pushes arbitrary payloads through the bounded inbox.  Oversize payloads
//! and overflow must be refused and counted, never truncated or panicked
//! on, and everything accepted must come out unchanged.
//!
//! cargo fuzz run fuzz_frame_inbox

#![no_main]

use cadencegate::inbox::{FRAME_CAPACITY, FrameInbox, INBOX_DEPTH};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|payloads: Vec<Vec<u8>>| {
    let inbox = FrameInbox::new();
    let sender = inbox.sender();

    let mut accepted = Vec::new();
    let mut refused = 0u32;
    for p in &payloads {
        if sender.send(p) {
            accepted.push(p.clone());
        } else {
            assert!(p.len() > FRAME_CAPACITY || accepted.len() >= INBOX_DEPTH);
            refused += 1;
        }
    }
    assert_eq!(inbox.dropped(), refused);

    for expected in &accepted {
        let got = inbox.try_recv().expect("accepted frame missing");
        assert_eq!(got.as_slice(), expected.as_slice());
    }
    assert!(inbox.try_recv().is_none());
});
