//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (sensor transport, gate service, event sinks, clock)
//! implement these traits.  The [`MonitorService`](super::service::MonitorService)
//! consumes them via generics, so the domain core never touches a radio
//! or an HTTP client directly.
//!
//! All port errors are typed and recoverable; the service retries on the
//! next tick.

use core::fmt;
use core::time::Duration;

use crate::error::{GateError, SensorError};
use crate::inbox::FrameSender;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor transport (driven adapter: radio → domain)
// ───────────────────────────────────────────────────────────────

/// Link to a CSC sensor.
///
/// Implementations deliver raw notification payloads through the
/// [`FrameSender`] given to [`subscribe`](Self::subscribe), typically from
/// their own thread.
pub trait SensorTransport {
    /// Establish the link.
    fn connect(&mut self) -> Result<(), SensorError>;

    /// Liveness check, called once per tick.
    fn is_connected(&self) -> bool;

    /// Enable measurement notifications.
    fn subscribe(&mut self, frames: FrameSender) -> Result<(), SensorError>;

    /// Tear the link down.  Must be safe to call when already disconnected.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Gate port (driven adapter: domain → firewall service)
// ───────────────────────────────────────────────────────────────

/// Identifier of a firewall rule on the gate service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enable/disable/status of a single blocking rule.
///
/// An enabled rule means access is **blocked**.  Every call must return
/// within the configured timeout (as [`GateError::Timeout`]) rather than
/// stall the loop.
pub trait GatePort {
    /// Look a rule up by name.
    fn find_rule(&mut self, name: &str) -> Result<Option<RuleId>, GateError>;

    /// Whether the rule is currently enabled.
    fn rule_status(&mut self, rule: &RuleId) -> Result<bool, GateError>;

    fn set_rule_enabled(&mut self, rule: &RuleId, enabled: bool) -> Result<(), GateError>;

    /// Block access.
    fn enable_rule(&mut self, rule: &RuleId) -> Result<(), GateError> {
        self.set_rule_enabled(rule, true)
    }

    /// Allow access.
    fn disable_rule(&mut self, rule: &RuleId) -> Result<(), GateError> {
        self.set_rule_enabled(rule, false)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / status)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

/// Fan one event out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time since the monitor started.
pub trait Clock {
    fn now(&self) -> Duration;
}
