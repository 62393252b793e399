//! Cycling Speed and Cadence measurement decoder.
//!
//! A CSC measurement notification carries cumulative counters, not a rate.
//! The cadence is derived from the difference between two consecutive
//! frames, so the decoder owns the last seen `(revolutions, event_time)`
//! pair in a [`CounterState`].
//!
//! ```text
//!  byte 0      flags   (0x01 wheel data, 0x02 crank data)
//!  byte 1..=2  cumulative crank revolutions   u16 LE
//!  byte 3..=4  last crank event time          u16 LE, 1/1024 s
//! ```
//!
//! Both counters roll over at 65536.  A negative difference is corrected
//! by adding 65536, which is exactly what `u16::wrapping_sub` yields.

use crate::error::FrameError;

/// Flag bit: wheel revolution data present.
pub const FLAG_WHEEL_DATA: u8 = 0x01;
/// Flag bit: crank revolution data present.
pub const FLAG_CRANK_DATA: u8 = 0x02;

/// Flags byte plus two little-endian u16 fields.
pub const CRANK_FRAME_LEN: usize = 5;

/// Event time ticks per minute (1024 ticks/s * 60 s).
pub const TICKS_PER_MINUTE: u32 = 1024 * 60;

/// Last crank counters seen on the current connection.
///
/// Both fields are set together or not at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    last: Option<(u16, u16)>,
}

impl CounterState {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// `(revolutions, event_time)` of the last parsed crank frame.
    pub fn last(&self) -> Option<(u16, u16)> {
        self.last
    }

    pub fn is_primed(&self) -> bool {
        self.last.is_some()
    }

    /// Forget the previous frame (connection lost).
    pub fn clear(&mut self) {
        self.last = None;
    }
}

/// Decode one notification frame into an optional cadence sample (RPM).
///
/// Returns `Ok(None)` for the first frame after a reset and whenever the
/// event time did not advance.  Errors leave `state` untouched.
pub fn decode(frame: &[u8], state: &mut CounterState) -> Result<Option<u32>, FrameError> {
    let Some(&flags) = frame.first() else {
        return Err(FrameError::Malformed);
    };
    if flags & FLAG_CRANK_DATA == 0 {
        return Err(FrameError::NoCrankData);
    }
    if frame.len() < CRANK_FRAME_LEN {
        return Err(FrameError::Malformed);
    }

    let revs = u16::from_le_bytes([frame[1], frame[2]]);
    let event_time = u16::from_le_bytes([frame[3], frame[4]]);

    let previous = state.last.replace((revs, event_time));
    let Some((prev_revs, prev_time)) = previous else {
        return Ok(None);
    };

    let rev_diff = u32::from(revs.wrapping_sub(prev_revs));
    let time_diff = u32::from(event_time.wrapping_sub(prev_time));
    if time_diff == 0 {
        return Ok(None);
    }

    // 65535 * 61440 < u32::MAX, so this never overflows.
    Ok(Some(rev_diff * TICKS_PER_MINUTE / time_diff))
}

/// Build a crank-only measurement frame.
pub fn crank_frame(revolutions: u16, event_time: u16) -> [u8; CRANK_FRAME_LEN] {
    let r = revolutions.to_le_bytes();
    let t = event_time.to_le_bytes();
    [FLAG_CRANK_DATA, r[0], r[1], t[0], t[1]]
}
