//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log lines, JSON status
//! lines, a dashboard feed.

use serde::Serialize;

use crate::error::{Error, FrameError, GateError, SensorError};
use crate::fsm::StateId;
use crate::sensors::FrameStats;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service started (carries initial state and observed gate status).
    Started { state: StateId, blocked: Option<bool> },

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Sensor connected and notifications enabled.
    SensorConnected,

    /// A connection attempt failed; retried after the backoff.
    SensorConnectFailed(SensorError),

    /// Liveness check failed on an established session.
    SensorLost,

    /// A frame was dropped by the decoder.
    FrameDropped(FrameError),

    /// The gate rule now matches the decision.
    GateChanged { blocked: bool, forced: bool },

    /// A gate call failed; the decision was left untouched.
    GateFailed { wanted_blocked: bool, error: GateError },

    /// Per-tick status.
    Snapshot(StatusSnapshot),

    /// Periodic status on the heartbeat interval.
    Heartbeat(StatusSnapshot),

    /// The loop exited.
    Stopped { blocked: Option<bool> },
}

impl AppEvent {
    /// The recoverable fault this event reports, if any.
    pub fn fault(&self) -> Option<Error> {
        match self {
            Self::SensorConnectFailed(e) => Some(Error::Sensor(*e)),
            Self::SensorLost => Some(Error::Sensor(SensorError::LinkLost)),
            Self::FrameDropped(e) => Some(Error::Frame(*e)),
            Self::GateFailed { error, .. } => Some(Error::Gate(*error)),
            _ => None,
        }
    }
}

/// Point-in-time status suitable for logging or a dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: StateId,
    /// Last instantaneous sample (RPM).
    pub current_rpm: u32,
    /// Smoothed cadence (RPM).
    pub average_rpm: f32,
    pub window_len: usize,
    pub window_capacity: usize,
    /// `None` until the gate status is known.
    pub blocked: Option<bool>,
    pub sensor_connected: bool,
    /// Whether the last gate call succeeded.
    pub gate_connected: bool,
    pub frames: FrameStats,
    /// Frames refused by the inbox (overflow or oversize).
    pub inbox_dropped: u32,
    /// Milliseconds since the monitor started.
    pub timestamp_ms: u64,
}
