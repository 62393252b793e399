//! Fuzz target: `csc::decode`
//!
//! Splits arbitrary bytes into frames and feeds them through one counter
//! state, the way a misbehaving sensor would.  The decoder must never
//! panic, and a rejected frame must leave the counters untouched.
//!
//! cargo fuzz run fuzz_csc_decoder

#![no_main]

use cadencegate::sensors::csc::{CounterState, decode};
use cadencegate::sensors::window::RollingWindow;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut state = CounterState::new();
    let mut window = RollingWindow::new(5);

    // First byte picks the frame length so short and long frames both occur.
    let Some((&len, mut rest)) = data.split_first() else {
        return;
    };
    let len = usize::from(len % 24);

    while !rest.is_empty() {
        let take = len.min(rest.len()).max(1);
        let (frame, tail) = rest.split_at(take);
        rest = tail;

        let before = state;
        match decode(frame, &mut state) {
            Ok(Some(rpm)) => window.push(rpm),
            Ok(None) => {}
            Err(_) => assert_eq!(state, before, "rejected frame changed counters"),
        }
        assert!(window.len() <= window.capacity());
    }

    if !window.is_empty() {
        assert!(window.average().is_finite());
    }
});
