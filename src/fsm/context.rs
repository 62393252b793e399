//! Shared mutable context threaded through every FSM handler.
//!
//! `MonitorContext` is the single struct that state handlers read from and
//! write to.  It contains the latest window snapshot, the commands the
//! service must carry out, timing information, and the link fault mask.
//! Think of it as the "blackboard" in a blackboard architecture.

use core::time::Duration;

use crate::safety::LinkFault;

// ---------------------------------------------------------------------------
// Window snapshot (read-only to state handlers; written by the service)
// ---------------------------------------------------------------------------

/// Point-in-time view of the cadence window.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowSnapshot {
    /// Samples currently held.
    pub len: usize,
    /// Configured window size.
    pub capacity: usize,
    /// Smoothed cadence (RPM).
    pub average_rpm: f32,
}

impl WindowSnapshot {
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }
}

// ---------------------------------------------------------------------------
// Monitor commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Requests from state handlers.  The service carries these out after the
/// FSM tick and clears them once done.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorCommands {
    /// Block the gate now, bypassing the grace period.  Stays set until a
    /// gate call succeeds.
    pub force_block: bool,
    /// Drop decoder counters and window samples.
    pub clear_samples: bool,
    /// Run evaluate + commit on the smoothed cadence.
    pub evaluate: bool,
}

// ---------------------------------------------------------------------------
// MonitorContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct MonitorContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Duration of one tick.
    pub tick_period: Duration,

    // -- Cadence --
    /// Latest window view.  Updated before each FSM tick.
    pub window: WindowSnapshot,

    // -- Outputs --
    pub commands: MonitorCommands,

    // -- Link --
    /// Fault bitmask from the link supervisor (see `LinkFault::mask()`).
    pub faults: u8,
}

impl MonitorContext {
    pub fn new(tick_period: Duration, window_capacity: usize) -> Self {
        Self {
            ticks_in_state: 0,
            tick_period,
            window: WindowSnapshot {
                capacity: window_capacity,
                ..WindowSnapshot::default()
            },
            commands: MonitorCommands::default(),
            faults: LinkFault::LinkDown.mask(),
        }
    }

    /// Time spent in the current state, in whole ticks.
    pub fn time_in_state(&self) -> Duration {
        self.tick_period
            .saturating_mul(u32::try_from(self.ticks_in_state).unwrap_or(u32::MAX))
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: LinkFault) -> bool {
        self.faults & fault.mask() != 0
    }

    pub fn link_up(&self) -> bool {
        !self.has_fault(LinkFault::LinkDown)
    }
}
