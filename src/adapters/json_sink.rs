//! JSON-lines status sink.
//!
//! Writes each heartbeat [`StatusSnapshot`] as one JSON object per line
//! to any `io::Write` (a file, a pipe, stdout).  A dashboard can tail the
//! output instead of polling the monitor.

use std::io::Write;

use log::warn;

use crate::app::events::{AppEvent, StatusSnapshot};
use crate::app::ports::EventSink;

/// Serializes status snapshots as JSON lines.
pub struct JsonLinesSink<W: Write> {
    out: W,
    /// Also write the per-tick snapshots, not just heartbeats.
    every_tick: bool,
    write_failed: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            every_tick: false,
            write_failed: false,
        }
    }

    #[must_use]
    pub fn every_tick(mut self, enabled: bool) -> Self {
        self.every_tick = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_snapshot(&mut self, snapshot: &StatusSnapshot) {
        let result = serde_json::to_writer(&mut self.out, snapshot)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        match result {
            Ok(()) => self.write_failed = false,
            Err(e) => {
                // Log once per failure streak.
                if !self.write_failed {
                    warn!("Status output write failed: {}", e);
                }
                self.write_failed = true;
            }
        }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Heartbeat(s) => self.write_snapshot(s),
            AppEvent::Snapshot(s) if self.every_tick => self.write_snapshot(s),
            _ => {}
        }
    }
}
