//! Mock adapters for integration tests.
//!
//! Records every gate call and emitted event so tests can assert on the
//! full history without a radio or a firewall controller.

use std::collections::VecDeque;
use std::time::Duration;

use cadencegate::app::events::AppEvent;
use cadencegate::app::ports::{EventSink, GatePort, RuleId, SensorTransport};
use cadencegate::app::service::MonitorService;
use cadencegate::config::{GateAuth, MonitorConfig};
use cadencegate::error::{GateError, SensorError};
use cadencegate::inbox::FrameSender;
use cadencegate::sensors::csc::crank_frame;

pub const RULE_NAME: &str = "block_youtube_peloton";
pub const RULE_ID: &str = "rule-1";

// ── MockSensor ────────────────────────────────────────────────

/// Scriptable sensor link.  Frames are pushed by the test through the
/// sender captured on subscribe.
pub struct MockSensor {
    pub link_up: bool,
    /// Results for upcoming connect attempts; empty means success.
    pub connect_script: VecDeque<Result<(), SensorError>>,
    pub fail_subscribe: bool,
    pub connects: u32,
    pub disconnects: u32,
    frames: Option<FrameSender>,
    revs: u16,
    event_time: u16,
}

#[allow(dead_code)]
impl MockSensor {
    pub fn new() -> Self {
        Self {
            link_up: false,
            connect_script: VecDeque::new(),
            fail_subscribe: false,
            connects: 0,
            disconnects: 0,
            frames: None,
            revs: 0,
            event_time: 0,
        }
    }

    pub fn push_raw(&self, bytes: &[u8]) -> bool {
        self.frames.as_ref().is_some_and(|f| f.send(bytes))
    }

    /// Send the current counters unchanged (primes the decoder, or looks
    /// like a stopped crank).
    pub fn repeat(&self) -> bool {
        self.push_raw(&crank_frame(self.revs, self.event_time))
    }

    /// Send a frame that decodes to exactly `rpm`: `rpm` revolutions over
    /// 60 s worth of event-time ticks.
    pub fn pedal(&mut self, rpm: u16) -> bool {
        self.revs = self.revs.wrapping_add(rpm);
        self.event_time = self.event_time.wrapping_add(61_440);
        self.push_raw(&crank_frame(self.revs, self.event_time))
    }
}

impl SensorTransport for MockSensor {
    fn connect(&mut self) -> Result<(), SensorError> {
        self.connects += 1;
        let result = self.connect_script.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.link_up = true;
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.link_up
    }

    fn subscribe(&mut self, frames: FrameSender) -> Result<(), SensorError> {
        if self.fail_subscribe {
            return Err(SensorError::SubscribeFailed);
        }
        self.frames = Some(frames);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.link_up = false;
    }
}

// ── MockGate ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCall {
    Find(String),
    Status,
    Set(bool),
}

pub struct MockGate {
    pub enabled: bool,
    pub has_rule: bool,
    pub find_error: Option<GateError>,
    pub status_error: Option<GateError>,
    /// Failures for upcoming set calls, in order.
    pub set_failures: VecDeque<GateError>,
    pub calls: Vec<GateCall>,
}

#[allow(dead_code)]
impl MockGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            has_rule: true,
            find_error: None,
            status_error: None,
            set_failures: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    pub fn set_calls(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GateCall::Set(v) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

impl GatePort for MockGate {
    fn find_rule(&mut self, name: &str) -> Result<Option<RuleId>, GateError> {
        self.calls.push(GateCall::Find(name.to_string()));
        if let Some(e) = self.find_error {
            return Err(e);
        }
        Ok((self.has_rule && name == RULE_NAME).then(|| RuleId::new(RULE_ID)))
    }

    fn rule_status(&mut self, _rule: &RuleId) -> Result<bool, GateError> {
        self.calls.push(GateCall::Status);
        match self.status_error {
            Some(e) => Err(e),
            None => Ok(self.enabled),
        }
    }

    fn set_rule_enabled(&mut self, rule: &RuleId, enabled: bool) -> Result<(), GateError> {
        assert_eq!(rule.as_str(), RULE_ID);
        self.calls.push(GateCall::Set(enabled));
        if let Some(e) = self.set_failures.pop_front() {
            return Err(e);
        }
        self.enabled = enabled;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Test config: window 5, threshold 60, grace 3 s, backoff 10 s, 1 s ticks.
pub fn test_config() -> MonitorConfig {
    let mut c = MonitorConfig::default();
    c.gate.auth = Some(GateAuth::ApiKey { key: "test".into() });
    c
}

/// Service plus mocks, with a 1 s simulated clock.
pub struct Harness {
    pub svc: MonitorService,
    pub sensor: MockSensor,
    pub gate: MockGate,
    pub sink: RecordingSink,
    /// Seconds value the next tick runs at.
    pub t: u64,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: &MonitorConfig, gate_enabled: bool) -> Self {
        let mut h = Self {
            svc: MonitorService::new(config),
            sensor: MockSensor::new(),
            gate: MockGate::new(gate_enabled),
            sink: RecordingSink::new(),
            t: 0,
        };
        h.svc
            .startup(&mut h.gate, &mut h.sink)
            .expect("startup should succeed");
        h
    }

    pub fn now(&self) -> Duration {
        Duration::from_secs(self.t)
    }

    /// Run one tick at `t`, then advance `t` by one second.
    pub fn tick(&mut self) {
        let now = self.now();
        self.svc
            .tick(now, &mut self.sensor, &mut self.gate, &mut self.sink);
        self.t += 1;
    }

    /// One second of pedaling at `rpm`, then a tick.
    pub fn pedal(&mut self, rpm: u16) {
        assert!(self.sensor.pedal(rpm), "frame refused");
        self.tick();
    }

    /// Connect, prime the decoder, and fill the window at `rpm`.
    /// Returns with the monitor in Steady.
    pub fn warm_up(&mut self, rpm: u16) {
        self.tick(); // connect
        assert!(self.sensor.repeat());
        self.tick(); // prime
        let n = self.svc.tracker().window().capacity();
        for _ in 0..n {
            self.pedal(rpm);
        }
    }

    pub fn shutdown(&mut self) {
        let now = self.now();
        self.svc
            .shutdown(now, &mut self.sensor, &mut self.gate, &mut self.sink);
    }
}
