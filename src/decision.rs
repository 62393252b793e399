//! Block/allow decision engine.
//!
//! Pure functions over the smoothed cadence.  The engine never talks to
//! the gate: the monitor commits against a scratch copy of
//! [`DecisionState`] and keeps it only when the gate call succeeds.
//!
//! ```text
//!  window not full ───────────────▶ desired = blocked   (fail-safe)
//!  avg <  threshold ──────────────▶ desired = blocked
//!  avg >= threshold ──────────────▶ desired = allowed
//!
//!  commit: desired != current && now - last_change >= grace
//!  force_block: ignores grace
//! ```

use core::time::Duration;

use crate::config::MonitorConfig;

/// Current gate decision and when it last changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionState {
    blocked: Option<bool>,
    last_change: Option<Duration>,
}

impl DecisionState {
    /// Unknown state (gate status not yet observed).
    pub const fn unknown() -> Self {
        Self {
            blocked: None,
            last_change: None,
        }
    }

    /// State seeded from the gate's reported status at startup.
    /// No change has been made by us yet, so grace does not apply.
    pub const fn observed(blocked: bool) -> Self {
        Self {
            blocked: Some(blocked),
            last_change: None,
        }
    }

    pub fn blocked(&self) -> Option<bool> {
        self.blocked
    }

    /// Unknown counts as blocked for reporting.
    pub fn is_blocked(&self) -> bool {
        self.blocked.unwrap_or(true)
    }

    pub fn last_change(&self) -> Option<Duration> {
        self.last_change
    }
}

/// Threshold and dwell-time rules.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    threshold_rpm: u32,
    grace: Duration,
}

impl DecisionEngine {
    pub fn new(threshold_rpm: u32, grace: Duration) -> Self {
        Self {
            threshold_rpm,
            grace,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.threshold_rpm, config.grace_period())
    }

    pub fn threshold_rpm(&self) -> u32 {
        self.threshold_rpm
    }

    /// Desired blocked state for the current window.
    pub fn evaluate(&self, average_rpm: f32, window_len: usize, window_capacity: usize) -> bool {
        if window_len < window_capacity {
            return true;
        }
        average_rpm < self.threshold_rpm as f32
    }

    /// Whether the grace period since the last change has elapsed.
    pub fn grace_elapsed(&self, state: &DecisionState, now: Duration) -> bool {
        state
            .last_change
            .is_none_or(|t| now.saturating_sub(t) >= self.grace)
    }

    /// Apply `desired` if it differs and the grace period has elapsed.
    ///
    /// Returns the new blocked value when the state changed.  A rejected
    /// intent is dropped, not queued.
    pub fn commit(&self, state: &mut DecisionState, desired: bool, now: Duration) -> Option<bool> {
        if state.blocked == Some(desired) || !self.grace_elapsed(state, now) {
            return None;
        }
        Self::apply(state, desired, now)
    }

    /// Block immediately, ignoring the grace period.
    pub fn force_block(&self, state: &mut DecisionState, now: Duration) -> Option<bool> {
        if state.blocked == Some(true) {
            return None;
        }
        Self::apply(state, true, now)
    }

    fn apply(state: &mut DecisionState, blocked: bool, now: Duration) -> Option<bool> {
        state.blocked = Some(blocked);
        state.last_change = Some(now);
        Some(blocked)
    }
}
