//! Monotonic time adapter.
//!
//! Provides the monitor's notion of "now" as a [`Duration`] since the
//! adapter was created, backed by `std::time::Instant`.

use core::time::Duration;
use std::time::Instant;

use crate::app::ports::Clock;

/// Clock anchored at construction time.
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since start (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}
