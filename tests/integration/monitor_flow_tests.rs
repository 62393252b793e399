//! Integration tests for the MonitorService → FSM → gate pipeline.
//!
//! These drive the service tick by tick on a simulated clock and verify
//! the gate calls and events that come out the other end.

use std::time::Duration;

use cadencegate::app::events::AppEvent;
use cadencegate::error::{FrameError, GateError, SensorError};
use cadencegate::fsm::StateId;

use super::mock_hw::{Harness, RULE_ID, RULE_NAME, test_config};

// ── Startup and warm-up ───────────────────────────────────────

#[test]
fn startup_resolves_rule_and_seeds_decision() {
    let h = Harness::new(&test_config(), true);
    assert_eq!(h.svc.rule().map(|r| r.as_str()), Some(RULE_ID));
    assert_eq!(h.svc.decision().blocked(), Some(true));
    assert_eq!(h.svc.state(), StateId::Disconnected);
    assert!(matches!(
        h.sink.events.first(),
        Some(AppEvent::Started {
            state: StateId::Disconnected,
            blocked: Some(true)
        })
    ));
}

#[test]
fn first_tick_connects_and_enters_warming() {
    let mut h = Harness::new(&test_config(), true);
    h.tick();
    assert_eq!(h.sensor.connects, 1);
    assert_eq!(h.svc.state(), StateId::Warming);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::SensorConnected)), 1);
    // Already blocked: no redundant gate call.
    assert!(h.gate.set_calls().is_empty());
}

#[test]
fn connect_blocks_an_allowed_gate() {
    let mut h = Harness::new(&test_config(), false);
    h.tick();
    assert_eq!(h.gate.set_calls(), vec![true]);
    assert!(h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(true));
}

#[test]
fn warm_window_blocks_until_full() {
    let mut h = Harness::new(&test_config(), true);
    h.tick(); // t=0 connect
    h.sensor.repeat();
    h.tick(); // t=1 prime
    for _ in 0..4 {
        h.pedal(120);
        assert_eq!(h.svc.state(), StateId::Warming);
        assert!(h.gate.enabled, "must stay blocked while warming");
    }
    h.pedal(120); // t=6, window full
    assert_eq!(h.svc.state(), StateId::Steady);
    assert!(!h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(false));
    assert_eq!(h.svc.decision().last_change(), Some(Duration::from_secs(6)));
}

// ── Decision flow ─────────────────────────────────────────────

#[test]
fn slowdown_blocks_after_average_drops() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(70); // allowed at t=6

    h.pedal(50); // t=7  [70,70,70,70,50] avg 66
    assert!(!h.gate.enabled);
    h.pedal(50); // t=8  avg 62
    assert!(!h.gate.enabled);
    h.pedal(50); // t=9  avg 58, 3 s since last change
    assert!(h.gate.enabled);
    assert_eq!(h.gate.set_calls(), vec![false, true]);
}

#[test]
fn grace_period_holds_an_early_flip() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(70); // allowed at t=6

    h.pedal(0); // t=7  avg 56, 1 s since change
    assert!(!h.gate.enabled);
    h.pedal(0); // t=8  avg 42, 2 s
    assert!(!h.gate.enabled);
    h.pedal(0); // t=9  3 s
    assert!(h.gate.enabled);
    assert_eq!(h.svc.decision().last_change(), Some(Duration::from_secs(9)));
}

#[test]
fn cadence_at_threshold_allows() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(60);
    assert!(!h.gate.enabled);
}

// ── Sensor loss ───────────────────────────────────────────────

#[test]
fn disconnect_forces_block_and_empties_window() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90); // allowed at t=6
    assert!(!h.gate.enabled);

    h.sensor.link_up = false;
    h.tick(); // t=7, grace not elapsed but fail-safe ignores it

    assert_eq!(h.svc.state(), StateId::Disconnected);
    assert!(h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(true));
    assert_eq!(h.svc.tracker().window().len(), 0);
    assert!(!h.svc.tracker().counters().is_primed());
    assert_eq!(h.svc.tracker().current_rpm(), 0);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::SensorLost)), 1);
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            AppEvent::GateChanged {
                blocked: true,
                forced: true
            }
        )),
        1
    );
}

#[test]
fn reconnect_is_attempted_right_after_loss() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90);
    h.sensor.link_up = false;
    h.tick(); // t=7 lost
    assert_eq!(h.svc.state(), StateId::Disconnected);
    assert_eq!(h.sensor.connects, 1);

    h.tick(); // t=8
    assert_eq!(h.sensor.connects, 2);
    assert_eq!(h.svc.state(), StateId::Warming);
    assert!(h.gate.enabled);
}

#[test]
fn failed_reconnect_after_loss_waits_for_backoff() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90);
    h.sensor.link_up = false;
    h.sensor.connect_script.push_back(Err(SensorError::ConnectFailed));
    h.tick(); // t=7 lost
    h.tick(); // t=8 attempt fails, next at t=18
    assert_eq!(h.sensor.connects, 2);
    assert_eq!(h.svc.state(), StateId::Disconnected);

    for _ in 9..18 {
        h.tick();
    }
    assert_eq!(h.sensor.connects, 2);
    h.tick(); // t=18
    assert_eq!(h.sensor.connects, 3);
    assert_eq!(h.svc.state(), StateId::Warming);
    assert_eq!(
        h.sink
            .count(|e| matches!(e, AppEvent::SensorConnectFailed(SensorError::ConnectFailed))),
        1
    );
}

#[test]
fn failed_connects_retry_every_backoff() {
    let mut h = Harness::new(&test_config(), true);
    h.sensor
        .connect_script
        .extend([Err(SensorError::ConnectFailed), Err(SensorError::ConnectFailed)]);

    for _ in 0..=20 {
        h.tick();
    }
    // t=0 fail, t=10 fail, t=20 ok
    assert_eq!(h.sensor.connects, 3);
    assert_eq!(h.svc.state(), StateId::Warming);
    assert_eq!(
        h.sink
            .count(|e| matches!(e, AppEvent::SensorConnectFailed(SensorError::ConnectFailed))),
        2
    );
}

#[test]
fn subscribe_failure_drops_the_link() {
    let mut h = Harness::new(&test_config(), true);
    h.sensor.fail_subscribe = true;
    h.tick();
    assert_eq!(h.svc.state(), StateId::Disconnected);
    assert!(!h.sensor.link_up);
    assert_eq!(h.sensor.disconnects, 1);
    assert_eq!(
        h.sink
            .count(|e| matches!(e, AppEvent::SensorConnectFailed(SensorError::SubscribeFailed))),
        1
    );
}

#[test]
fn late_frames_do_not_survive_link_loss() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90);
    h.sensor.link_up = false;
    h.sensor.pedal(90);
    h.tick();
    assert_eq!(h.svc.tracker().window().len(), 0);
}

// ── Gate failures ─────────────────────────────────────────────

#[test]
fn gate_failure_leaves_decision_untouched_and_retries() {
    let mut h = Harness::new(&test_config(), true);
    h.tick();
    h.sensor.repeat();
    h.tick();
    for _ in 0..4 {
        h.pedal(90);
    }
    h.gate.set_failures.push_back(GateError::Timeout);
    h.pedal(90); // t=6 allow attempt fails

    assert!(h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(true));
    assert_eq!(h.svc.decision().last_change(), None);
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            AppEvent::GateFailed {
                wanted_blocked: false,
                error: GateError::Timeout
            }
        )),
        1
    );

    h.pedal(90); // t=7 retried
    assert!(!h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(false));
    assert_eq!(h.gate.set_calls(), vec![false, false]);
}

#[test]
fn fail_safe_block_retried_until_accepted() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90);
    h.gate
        .set_failures
        .extend([GateError::Unreachable, GateError::Rejected(502)]);

    h.sensor.link_up = false;
    h.tick(); // t=7 lost
    assert!(!h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(false));
    h.tick(); // t=8 reconnected, still pending
    assert_eq!(h.svc.state(), StateId::Warming);
    assert!(!h.gate.enabled);
    h.tick();
    assert!(h.gate.enabled);
    assert_eq!(h.svc.decision().blocked(), Some(true));
    assert_eq!(h.gate.set_calls(), vec![false, true, true, true]);
}

// ── Frames ────────────────────────────────────────────────────

#[test]
fn malformed_frame_is_dropped_without_state_change() {
    let mut h = Harness::new(&test_config(), true);
    h.tick();
    h.sensor.repeat();
    h.tick();
    h.pedal(80);
    let counters = *h.svc.tracker().counters();
    let len = h.svc.tracker().window().len();

    h.sensor.push_raw(&[0x02, 0x10, 0x00]);
    h.tick();

    assert_eq!(*h.svc.tracker().counters(), counters);
    assert_eq!(h.svc.tracker().window().len(), len);
    assert_eq!(h.svc.tracker().stats().malformed, 1);
    assert_eq!(
        h.sink
            .count(|e| matches!(e, AppEvent::FrameDropped(FrameError::Malformed))),
        1
    );
}

#[test]
fn wheel_only_frames_are_ignored() {
    let mut h = Harness::new(&test_config(), true);
    h.tick();
    h.sensor.push_raw(&[0x01, 1, 0, 0, 0, 0, 0]);
    h.tick();
    assert_eq!(h.svc.tracker().stats().no_crank, 1);
    assert!(!h.svc.tracker().counters().is_primed());
}

// ── Idle detection ────────────────────────────────────────────

#[test]
fn stopped_crank_decays_to_blocked() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90); // allowed at t=6, last sample at t=6

    // Sensor keeps repeating the same counters: no new samples.
    for _ in 0..12 {
        h.sensor.repeat();
        h.tick();
    }
    assert!(h.svc.tracker().stats().idle_fills > 0);
    assert_eq!(h.svc.tracker().current_rpm(), 0);
    assert!(h.gate.enabled);
    assert_eq!(h.svc.state(), StateId::Steady);
}

#[test]
fn idle_detection_can_be_disabled() {
    let mut config = test_config();
    config.idle_timeout_secs = 0;
    let mut h = Harness::new(&config, true);
    h.warm_up(90);
    for _ in 0..12 {
        h.tick();
    }
    assert_eq!(h.svc.tracker().stats().idle_fills, 0);
    assert!(!h.gate.enabled);
}

// ── Status and shutdown ───────────────────────────────────────

#[test]
fn heartbeat_follows_its_own_deadline() {
    let mut h = Harness::new(&test_config(), true);
    for _ in 0..=25 {
        h.tick();
    }
    // t=0, 10, 20
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::Heartbeat(_))), 3);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::Snapshot(_))), 26);
}

#[test]
fn snapshot_reflects_monitor_state() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(75);
    let s = h.svc.snapshot(h.now());
    assert_eq!(s.state, StateId::Steady);
    assert_eq!(s.current_rpm, 75);
    assert!((s.average_rpm - 75.0).abs() < f32::EPSILON);
    assert_eq!(s.blocked, Some(false));
    assert!(s.sensor_connected);
    assert!(s.gate_connected);
    assert_eq!(s.timestamp_ms, 7000);
}

#[test]
fn shutdown_leaves_gate_blocked() {
    let mut h = Harness::new(&test_config(), true);
    h.warm_up(90);
    assert!(!h.gate.enabled);
    h.shutdown();
    assert!(h.gate.enabled);
    assert!(!h.sensor.link_up);
    assert!(!h.sensor.push_raw(&[0x02, 0, 0, 0, 0]));
    assert!(matches!(
        h.sink.events.last(),
        Some(AppEvent::Stopped { blocked: Some(true) })
    ));
}

#[test]
fn shutdown_can_leave_gate_alone() {
    let mut config = test_config();
    config.block_on_shutdown = false;
    let mut h = Harness::new(&config, true);
    h.warm_up(90);
    h.shutdown();
    assert!(!h.gate.enabled);
}

#[test]
fn rule_name_lookup_uses_configured_name() {
    let h = Harness::new(&test_config(), true);
    assert_eq!(
        h.gate.calls.first(),
        Some(&super::mock_hw::GateCall::Find(RULE_NAME.to_string()))
    );
}
