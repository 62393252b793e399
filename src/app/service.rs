//! Monitor service, the hexagonal core.
//!
//! [`MonitorService`] owns the FSM, link supervisor, cadence tracker and
//! decision state.  All I/O flows through port traits injected at call
//! sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  SensorTransport ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!                      │      MonitorService        │
//!         GatePort ◀── │  FSM · Link · Decision     │
//!                      └───────────────────────────┘
//! ```
//!
//! Time is passed in as a [`Duration`] since start, so the service never
//! reads a clock itself.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::decision::{DecisionEngine, DecisionState};
use crate::error::{GateError, SensorError, StartupError};
use crate::fsm::context::{MonitorContext, WindowSnapshot};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::inbox::{FrameInbox, FrameSender};
use crate::safety::{LinkFault, LinkObservation, LinkSupervisor};
use crate::sensors::CadenceTracker;

use super::events::{AppEvent, StatusSnapshot};
use super::ports::{EventSink, GatePort, RuleId, SensorTransport};

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

/// The monitor service orchestrates all domain logic.
pub struct MonitorService {
    fsm: Fsm,
    ctx: MonitorContext,
    link: LinkSupervisor,
    tracker: CadenceTracker,
    engine: DecisionEngine,
    decision: DecisionState,
    inbox: FrameInbox,

    rule_name: String,
    rule: Option<RuleId>,

    /// A connect + subscribe succeeded and the link has not been lost since.
    session_active: bool,
    next_reconnect_at: Duration,
    reconnect_backoff: Duration,

    next_status_at: Duration,
    status_interval: Duration,

    /// Last gate call succeeded.
    gate_ok: bool,
    block_on_shutdown: bool,
    tick_count: u64,
}

impl MonitorService {
    /// Construct the service from configuration.
    ///
    /// Does **not** contact the gate; call [`startup`](Self::startup) next.
    pub fn new(config: &MonitorConfig) -> Self {
        let ctx = MonitorContext::new(config.tick_period(), config.window_size);
        let tracker = CadenceTracker::new(config.window_size);
        let fsm = Fsm::new(build_state_table(), StateId::Disconnected);

        Self {
            fsm,
            ctx,
            link: LinkSupervisor::new(config.idle_timeout()),
            tracker,
            engine: DecisionEngine::from_config(config),
            decision: DecisionState::unknown(),
            inbox: FrameInbox::new(),
            rule_name: config.gate.rule_name.clone(),
            rule: config.gate.rule_id.clone().map(RuleId::new),
            session_active: false,
            next_reconnect_at: Duration::ZERO,
            reconnect_backoff: config.reconnect_backoff(),
            next_status_at: Duration::ZERO,
            status_interval: config.status_interval(),
            gate_ok: false,
            block_on_shutdown: config.block_on_shutdown,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Resolve the rule and seed the decision from its current status,
    /// then start the FSM.
    ///
    /// An unresolvable rule is fatal.  An unreadable status is not: the
    /// decision starts unknown and the first connect blocks.
    pub fn startup(
        &mut self,
        gate: &mut impl GatePort,
        sink: &mut impl EventSink,
    ) -> Result<(), StartupError> {
        let rule = match self.rule.clone() {
            Some(rule) => rule,
            None => {
                let found = gate.find_rule(&self.rule_name)?;
                let rule = found.ok_or_else(|| StartupError::RuleNotFound(self.rule_name.clone()))?;
                info!("Resolved rule '{}' -> {}", self.rule_name, rule);
                self.rule = Some(rule.clone());
                rule
            }
        };

        match gate.rule_status(&rule) {
            Ok(enabled) => {
                self.decision = DecisionState::observed(enabled);
                self.gate_ok = true;
                info!(
                    "Rule {} currently {}",
                    rule,
                    if enabled { "ENABLED (blocked)" } else { "DISABLED (allowed)" }
                );
            }
            Err(e) => {
                self.decision = DecisionState::unknown();
                self.gate_ok = false;
                warn!("Could not read status of rule {}: {}; starting unknown", rule, e);
            }
        }

        self.fsm.start(&mut self.ctx);
        // Nothing has been collected yet.
        self.ctx.commands.clear_samples = false;
        sink.emit(&AppEvent::Started {
            state: self.fsm.current_state(),
            blocked: self.decision.blocked(),
        });
        info!("MonitorService started in {}", self.fsm.current_state());
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one monitor cycle:
    /// frames → reconnect → link check → FSM → gate → status.
    pub fn tick(
        &mut self,
        now: Duration,
        transport: &mut impl SensorTransport,
        gate: &mut impl GatePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Decode everything that arrived since the last tick
        self.drain_frames(now, sink);

        // 2. Reconnect when due
        if !self.session_active && now >= self.next_reconnect_at {
            self.try_connect(now, transport, sink);
        }

        // 3. Link supervision
        let obs = LinkObservation {
            session_active: self.session_active,
            transport_connected: self.session_active && transport.is_connected(),
            idle_for: self.tracker.idle_for(now),
        };
        self.ctx.faults = self.link.evaluate(&obs);

        if self.session_active && self.link.has_fault(LinkFault::LinkDown) {
            self.session_active = false;
            transport.disconnect();
            // Backoff applies only after a failed attempt
            self.next_reconnect_at = now;
            sink.emit(&AppEvent::SensorLost);
        }

        if self.link.has_fault(LinkFault::SignalStale) {
            self.tracker.push_idle_sample();
        }

        // 4. FSM tick (pure state logic)
        self.refresh_window();
        self.fsm.tick(&mut self.ctx);

        // 5. Carry out FSM commands
        if self.ctx.commands.clear_samples {
            self.tracker.reset();
            let stale = self.inbox.clear();
            if stale > 0 {
                debug!("Discarded {} queued frames from lost session", stale);
            }
            self.ctx.commands.clear_samples = false;
            self.refresh_window();
        }

        if self.ctx.commands.force_block {
            self.apply_force_block(now, gate, sink);
        } else if self.ctx.commands.evaluate {
            self.apply_decision(now, gate, sink);
        }

        // 6. Events
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        let snapshot = self.snapshot(now);
        if now >= self.next_status_at {
            self.next_status_at += self.status_interval;
            if self.next_status_at <= now {
                self.next_status_at = now + self.status_interval;
            }
            sink.emit(&AppEvent::Heartbeat(snapshot.clone()));
        }
        sink.emit(&AppEvent::Snapshot(snapshot));
    }

    /// Stop: refuse new frames, drop the sensor link, and optionally leave
    /// the gate blocked.
    pub fn shutdown(
        &mut self,
        now: Duration,
        transport: &mut impl SensorTransport,
        gate: &mut impl GatePort,
        sink: &mut impl EventSink,
    ) {
        self.inbox.close();
        self.session_active = false;
        transport.disconnect();

        if self.block_on_shutdown {
            let mut next = self.decision;
            if self.engine.force_block(&mut next, now).is_some() {
                match self.push_to_gate(true, gate) {
                    Ok(()) => {
                        self.decision = next;
                        info!("Shutdown: rule enabled (blocked)");
                    }
                    Err(e) => warn!("Shutdown: could not enable rule: {}", e),
                }
            }
        }

        sink.emit(&AppEvent::Stopped {
            blocked: self.decision.blocked(),
        });
        info!("MonitorService stopped after {} ticks", self.tick_count);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a status snapshot from the current state.
    pub fn snapshot(&self, now: Duration) -> StatusSnapshot {
        StatusSnapshot {
            state: self.fsm.current_state(),
            current_rpm: self.tracker.current_rpm(),
            average_rpm: self.tracker.average(),
            window_len: self.tracker.window().len(),
            window_capacity: self.tracker.window().capacity(),
            blocked: self.decision.blocked(),
            sensor_connected: self.session_active,
            gate_connected: self.gate_ok,
            frames: self.tracker.stats(),
            inbox_dropped: self.inbox.dropped(),
            timestamp_ms: u64::try_from(now.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn decision(&self) -> &DecisionState {
        &self.decision
    }

    pub fn tracker(&self) -> &CadenceTracker {
        &self.tracker
    }

    pub fn rule(&self) -> Option<&RuleId> {
        self.rule.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// A sender for the inbox.  Transports get one on subscribe.
    pub fn frame_sender(&self) -> FrameSender {
        self.inbox.sender()
    }

    // ── Internal ──────────────────────────────────────────────

    fn drain_frames(&mut self, now: Duration, sink: &mut impl EventSink) {
        while let Some(frame) = self.inbox.try_recv() {
            if !self.session_active {
                continue;
            }
            if let Err(e) = self.tracker.on_frame(&frame, now) {
                sink.emit(&AppEvent::FrameDropped(e));
            }
        }
    }

    fn try_connect(
        &mut self,
        now: Duration,
        transport: &mut impl SensorTransport,
        sink: &mut impl EventSink,
    ) {
        info!("Connecting to cadence sensor...");
        match Self::open_session(transport, self.inbox.sender()) {
            Ok(()) => {
                self.session_active = true;
                self.inbox.clear();
                self.tracker.begin(now);
                sink.emit(&AppEvent::SensorConnected);
                info!("Cadence sensor connected, notifications enabled");
            }
            Err(e) => {
                self.next_reconnect_at = now + self.reconnect_backoff;
                warn!(
                    "{}; retrying in {}s",
                    e,
                    self.reconnect_backoff.as_secs()
                );
                sink.emit(&AppEvent::SensorConnectFailed(e));
            }
        }
    }

    fn open_session(
        transport: &mut impl SensorTransport,
        frames: FrameSender,
    ) -> Result<(), SensorError> {
        transport.connect()?;
        if let Err(e) = transport.subscribe(frames) {
            transport.disconnect();
            return Err(e);
        }
        Ok(())
    }

    fn refresh_window(&mut self) {
        let window = self.tracker.window();
        self.ctx.window = WindowSnapshot {
            len: window.len(),
            capacity: window.capacity(),
            average_rpm: window.average(),
        };
    }

    /// Fail-safe block, bypassing grace.  The request stays pending until
    /// the gate accepts it.
    fn apply_force_block(&mut self, now: Duration, gate: &mut impl GatePort, sink: &mut impl EventSink) {
        let mut next = self.decision;
        if self.engine.force_block(&mut next, now).is_none() {
            self.ctx.commands.force_block = false;
            return;
        }
        match self.push_to_gate(true, gate) {
            Ok(()) => {
                self.decision = next;
                self.ctx.commands.force_block = false;
                info!("BLOCKED (fail-safe)");
                sink.emit(&AppEvent::GateChanged {
                    blocked: true,
                    forced: true,
                });
            }
            Err(e) => {
                warn!("Fail-safe block failed: {}; retrying next tick", e);
                sink.emit(&AppEvent::GateFailed {
                    wanted_blocked: true,
                    error: e,
                });
            }
        }
    }

    /// Evaluate the smoothed cadence and commit through the grace period.
    fn apply_decision(&mut self, now: Duration, gate: &mut impl GatePort, sink: &mut impl EventSink) {
        let window = self.tracker.window();
        let average = window.average();
        let desired = self.engine.evaluate(average, window.len(), window.capacity());

        let mut next = self.decision;
        let Some(blocked) = self.engine.commit(&mut next, desired, now) else {
            return;
        };

        match self.push_to_gate(blocked, gate) {
            Ok(()) => {
                self.decision = next;
                if blocked {
                    info!(
                        "BLOCKED: cadence {:.1} RPM below {} RPM",
                        average,
                        self.engine.threshold_rpm()
                    );
                } else {
                    info!(
                        "ALLOWED: cadence {:.1} RPM at or above {} RPM",
                        average,
                        self.engine.threshold_rpm()
                    );
                }
                sink.emit(&AppEvent::GateChanged {
                    blocked,
                    forced: false,
                });
            }
            Err(e) => {
                warn!(
                    "Gate update to {} failed: {}; decision unchanged",
                    if blocked { "blocked" } else { "allowed" },
                    e
                );
                sink.emit(&AppEvent::GateFailed {
                    wanted_blocked: blocked,
                    error: e,
                });
            }
        }
    }

    fn push_to_gate(&mut self, blocked: bool, gate: &mut impl GatePort) -> Result<(), GateError> {
        let Some(rule) = self.rule.as_ref() else {
            return Err(GateError::RuleNotFound);
        };
        let result = if blocked {
            gate.enable_rule(rule)
        } else {
            gate.disable_rule(rule)
        };
        self.gate_ok = result.is_ok();
        result
    }
}
