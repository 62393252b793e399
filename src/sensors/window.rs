//! Rolling average over the most recent cadence samples.
//!
//! Fixed upper bound of [`MAX_WINDOW`] entries (no heap); the effective
//! capacity is chosen at construction from configuration.

use heapless::Deque;

/// Compile-time ceiling for the window size.
pub const MAX_WINDOW: usize = 64;

/// Bounded FIFO of RPM samples.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: Deque<u32, MAX_WINDOW>,
    capacity: usize,
}

impl RollingWindow {
    /// `capacity` is clamped to `1..=MAX_WINDOW`.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, MAX_WINDOW),
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, rpm: u32) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        // capacity <= MAX_WINDOW, so there is always room after eviction
        let _ = self.samples.push_back(rpm);
    }

    /// Arithmetic mean, or `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().map(|&s| u64::from(s)).sum();
        (sum as f64 / self.samples.len() as f64) as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().copied()
    }
}
