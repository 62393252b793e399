//! Link supervisor.
//!
//! The supervisor runs **every tick before the FSM** and accumulates a
//! fault bitmask in `MonitorContext.faults`.  State handlers read the
//! mask to decide whether to fall back to `Disconnected`.
//!
//! ## Fault lifecycle
//!
//! 1. The liveness check fails or samples stop arriving.
//! 2. The supervisor sets the matching bit and logs it once.
//! 3. `LinkDown` sends any connected state to `Disconnected`, which
//!    force-blocks the gate.  `SignalStale` keeps the link but feeds
//!    zero samples so the average decays.
//! 4. Each tick the supervisor re-evaluates and clears bits whose
//!    condition is gone.

use core::fmt;
use core::time::Duration;

use log::{info, warn};

/// Individual link fault conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFault {
    /// Transport reports the sensor disconnected.
    LinkDown,
    /// Connected, but no cadence sample within the idle timeout.
    SignalStale,
}

impl LinkFault {
    pub const fn mask(self) -> u8 {
        match self {
            Self::LinkDown => 0b01,
            Self::SignalStale => 0b10,
        }
    }
}

impl fmt::Display for LinkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "sensor link down"),
            Self::SignalStale => write!(f, "no cadence samples (crank stopped?)"),
        }
    }
}

/// Inputs sampled by the service before each supervisor pass.
#[derive(Debug, Clone, Copy)]
pub struct LinkObservation {
    /// Whether the service believes a session is established.
    pub session_active: bool,
    /// Result of the transport's liveness check.
    pub transport_connected: bool,
    /// Time since the last cadence sample, if a session started.
    pub idle_for: Option<Duration>,
}

/// Link supervisor.
pub struct LinkSupervisor {
    idle_timeout: Option<Duration>,
    /// Latched fault bitmask.
    faults: u8,
}

impl LinkSupervisor {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            idle_timeout,
            // No session yet.
            faults: LinkFault::LinkDown.mask(),
        }
    }

    /// Evaluate all link conditions.  Returns the updated fault bitmask.
    pub fn evaluate(&mut self, obs: &LinkObservation) -> u8 {
        let link_down = !(obs.session_active && obs.transport_connected);
        self.eval_fault(LinkFault::LinkDown, link_down, obs.session_active);

        let stale = !link_down
            && matches!(
                (self.idle_timeout, obs.idle_for),
                (Some(limit), Some(idle)) if idle >= limit
            );
        self.eval_fault(LinkFault::SignalStale, stale, true);

        self.faults
    }

    pub fn has_fault(&self, fault: LinkFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit.  `announce` controls whether a newly set
    /// bit is logged (a link that was never up is not news).
    fn eval_fault(&mut self, fault: LinkFault, condition: bool, announce: bool) {
        if condition {
            if self.faults & fault.mask() == 0 && announce {
                warn!("LINK FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("LINK FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
