//! Startup: rule resolution and initial gate status.

use cadencegate::app::events::AppEvent;
use cadencegate::app::service::MonitorService;
use cadencegate::error::{GateError, StartupError};
use cadencegate::fsm::StateId;

use super::mock_hw::{GateCall, MockGate, MockSensor, RULE_ID, RecordingSink, test_config};

#[test]
fn missing_rule_is_fatal() {
    let mut svc = MonitorService::new(&test_config());
    let mut gate = MockGate::new(true);
    gate.has_rule = false;
    let mut sink = RecordingSink::new();

    let err = svc.startup(&mut gate, &mut sink).unwrap_err();
    assert_eq!(
        err,
        StartupError::RuleNotFound("block_youtube_peloton".into())
    );
    assert!(err.to_string().contains("block_youtube_peloton"));
    assert!(sink.events.is_empty());
}

#[test]
fn unreachable_gate_during_lookup_is_fatal() {
    let mut svc = MonitorService::new(&test_config());
    let mut gate = MockGate::new(true);
    gate.find_error = Some(GateError::Unauthorized);

    assert_eq!(
        svc.startup(&mut gate, &mut RecordingSink::new()),
        Err(StartupError::Gate(GateError::Unauthorized))
    );
}

#[test]
fn configured_rule_id_skips_lookup() {
    let mut config = test_config();
    config.gate.rule_id = Some(RULE_ID.into());
    let mut svc = MonitorService::new(&config);
    let mut gate = MockGate::new(false);

    svc.startup(&mut gate, &mut RecordingSink::new()).unwrap();
    assert_eq!(gate.calls, vec![GateCall::Status]);
    assert_eq!(svc.decision().blocked(), Some(false));
}

#[test]
fn unreadable_status_starts_unknown_and_blocks_on_connect() {
    let mut svc = MonitorService::new(&test_config());
    let mut gate = MockGate::new(false);
    gate.status_error = Some(GateError::Timeout);
    let mut sensor = MockSensor::new();
    let mut sink = RecordingSink::new();

    svc.startup(&mut gate, &mut sink).unwrap();
    assert_eq!(svc.decision().blocked(), None);
    assert!(svc.decision().is_blocked());
    assert!(matches!(
        sink.events.first(),
        Some(AppEvent::Started { blocked: None, .. })
    ));

    svc.tick(std::time::Duration::ZERO, &mut sensor, &mut gate, &mut sink);
    assert_eq!(svc.state(), StateId::Warming);
    assert_eq!(gate.set_calls(), vec![true]);
    assert_eq!(svc.decision().blocked(), Some(true));
}

#[test]
fn startup_does_not_touch_the_rule() {
    let mut svc = MonitorService::new(&test_config());
    let mut gate = MockGate::new(false);
    svc.startup(&mut gate, &mut RecordingSink::new()).unwrap();
    assert!(gate.set_calls().is_empty());
    assert!(!gate.enabled);
}
