//! Sensor subsystem: CSC decoding and smoothing, aggregated by
//! [`CadenceTracker`].
//!
//! The tracker owns the decoder's counter state and the rolling window for
//! one sensor connection and produces the smoothed cadence that gets
//! written into `MonitorContext` each tick.

pub mod csc;
pub mod window;

use core::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::error::FrameError;
use csc::CounterState;
use window::RollingWindow;

/// Frame accounting since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Frames that parsed (with or without producing a sample).
    pub decoded: u32,
    /// Frames rejected as malformed.
    pub malformed: u32,
    /// Frames without crank data.
    pub no_crank: u32,
    /// Zero samples injected by idle detection.
    pub idle_fills: u32,
}

/// Owns decoder state and the rolling window.
#[derive(Debug, Clone)]
pub struct CadenceTracker {
    counters: CounterState,
    window: RollingWindow,
    current_rpm: u32,
    /// Last time a sample arrived, or the connection time if none has yet.
    last_activity: Option<Duration>,
    stats: FrameStats,
}

impl CadenceTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            counters: CounterState::new(),
            window: RollingWindow::new(window_size),
            current_rpm: 0,
            last_activity: None,
            stats: FrameStats::default(),
        }
    }

    /// Decode one raw frame and feed any resulting sample into the window.
    ///
    /// Malformed frames are logged and dropped; the caller only needs the
    /// result for accounting.
    pub fn on_frame(&mut self, frame: &[u8], now: Duration) -> Result<Option<u32>, FrameError> {
        match csc::decode(frame, &mut self.counters) {
            Ok(sample) => {
                self.stats.decoded = self.stats.decoded.wrapping_add(1);
                if let Some(rpm) = sample {
                    self.window.push(rpm);
                    self.current_rpm = rpm;
                    self.last_activity = Some(now);
                }
                Ok(sample)
            }
            Err(FrameError::NoCrankData) => {
                self.stats.no_crank = self.stats.no_crank.wrapping_add(1);
                debug!("CSC frame without crank data ignored");
                Err(FrameError::NoCrankData)
            }
            Err(FrameError::Malformed) => {
                self.stats.malformed = self.stats.malformed.wrapping_add(1);
                warn!("Malformed CSC frame dropped ({} bytes)", frame.len());
                Err(FrameError::Malformed)
            }
        }
    }

    /// Record a zero-RPM sample for a stopped crank.
    pub fn push_idle_sample(&mut self) {
        self.window.push(0);
        self.current_rpm = 0;
        self.stats.idle_fills = self.stats.idle_fills.wrapping_add(1);
    }

    /// Time since the last sample (or connection), if a connection started.
    pub fn idle_for(&self, now: Duration) -> Option<Duration> {
        self.last_activity.map(|t| now.saturating_sub(t))
    }

    /// Start a fresh connection at `now`.
    pub fn begin(&mut self, now: Duration) {
        self.reset();
        self.last_activity = Some(now);
    }

    /// Drop everything tied to the current connection.
    pub fn reset(&mut self) {
        self.counters.clear();
        self.window.clear();
        self.current_rpm = 0;
        self.last_activity = None;
    }

    pub fn average(&self) -> f32 {
        self.window.average()
    }

    pub fn current_rpm(&self) -> u32 {
        self.current_rpm
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn counters(&self) -> &CounterState {
        &self.counters
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
