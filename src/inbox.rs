//! Frame inbox between the sensor transport and the monitor loop.
//!
//! Uses an `embassy-sync` bounded channel to bridge the transport's
//! notification thread with the control loop without a lock held across
//! decode.  The loop drains the inbox at the start of each tick.
//!
//! ```text
//! ┌──────────────────┐   RawFrame   ┌──────────────┐
//! │ Transport thread │─────────────▶│ Monitor loop │
//! │ (FrameSender)    │   try_send   │ (FrameInbox) │
//! └──────────────────┘              └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Largest notification payload accepted (default ATT MTU payload).
pub const FRAME_CAPACITY: usize = 20;

/// Frames buffered between two ticks before new ones are dropped.
pub const INBOX_DEPTH: usize = 32;

/// One raw notification payload.
pub type RawFrame = Vec<u8, FRAME_CAPACITY>;

struct Shared {
    channel: Channel<CriticalSectionRawMutex, RawFrame, INBOX_DEPTH>,
    open: AtomicBool,
    dropped: AtomicU32,
}

/// Receiving side, owned by the monitor service.
pub struct FrameInbox {
    shared: Arc<Shared>,
}

/// Sending side, handed to the transport on subscribe.
#[derive(Clone)]
pub struct FrameSender {
    shared: Arc<Shared>,
}

impl Default for FrameInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameInbox {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                channel: Channel::new(),
                open: AtomicBool::new(true),
                dropped: AtomicU32::new(0),
            }),
        }
    }

    pub fn sender(&self) -> FrameSender {
        FrameSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn try_recv(&self) -> Option<RawFrame> {
        self.shared.channel.try_receive().ok()
    }

    /// Discard everything queued (stale frames from a lost connection).
    pub fn clear(&self) -> usize {
        let mut n = 0;
        while self.shared.channel.try_receive().is_ok() {
            n += 1;
        }
        n
    }

    /// Refuse further frames.
    pub fn close(&self) {
        self.shared.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Frames lost to overflow or oversize payloads.
    pub fn dropped(&self) -> u32 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl FrameSender {
    /// Queue a notification payload.  Never blocks; returns `false` when
    /// the frame was refused.
    pub fn send(&self, payload: &[u8]) -> bool {
        if !self.shared.open.load(Ordering::Acquire) {
            return false;
        }
        let Ok(frame) = RawFrame::from_slice(payload) else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if self.shared.channel.try_send(frame).is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }
}
