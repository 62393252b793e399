//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (the binary routes them to stderr).
//! [`JsonLinesSink`](super::json_sink::JsonLinesSink) implements the same
//! trait for machine-readable status.

use log::{debug, info, warn};

use crate::app::events::{AppEvent, StatusSnapshot};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn gate_label(blocked: Option<bool>) -> &'static str {
    match blocked {
        Some(true) => "BLOCKED",
        Some(false) => "ALLOWED",
        None => "UNKNOWN",
    }
}

fn status_line(s: &StatusSnapshot) -> String {
    format!(
        "state={} | rpm={} avg={:.1} ({}/{}) | gate={} | sensor={} api={} | \
         frames ok={} bad={} no_crank={} idle={} overflow={}",
        s.state,
        s.current_rpm,
        s.average_rpm,
        s.window_len,
        s.window_capacity,
        gate_label(s.blocked),
        if s.sensor_connected { "up" } else { "down" },
        if s.gate_connected { "ok" } else { "err" },
        s.frames.decoded,
        s.frames.malformed,
        s.frames.no_crank,
        s.frames.idle_fills,
        s.inbox_dropped,
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { state, blocked } => {
                info!("START | state={} gate={}", state, gate_label(*blocked));
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::SensorConnected => {
                info!("SENSOR | connected");
            }
            AppEvent::SensorConnectFailed(_) | AppEvent::SensorLost | AppEvent::GateFailed { .. } => {
                if let Some(fault) = event.fault() {
                    warn!("FAULT | {}", fault);
                }
            }
            AppEvent::FrameDropped(_) => {
                if let Some(fault) = event.fault() {
                    debug!("FAULT | {}", fault);
                }
            }
            AppEvent::GateChanged { blocked, forced } => {
                info!(
                    "GATE | {}{}",
                    gate_label(Some(*blocked)),
                    if *forced { " (fail-safe)" } else { "" }
                );
            }
            AppEvent::Snapshot(s) => {
                debug!("TICK | {}", status_line(s));
            }
            AppEvent::Heartbeat(s) => {
                info!("STATUS | {}", status_line(s));
            }
            AppEvent::Stopped { blocked } => {
                info!("STOP | gate={}", gate_label(*blocked));
            }
        }
    }
}
