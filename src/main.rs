//! CadenceGate main entry point
//!
//! Hexagonal architecture: pure monitor core, adapters at the edge.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedCadenceSensor   SimulatedGate   LogEventSink         │
//! │  (SensorTransport)        (GatePort)      JsonLinesSink        │
//! │  MonotonicClock (Clock)                   (EventSink)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            MonitorService (pure logic)                 │    │
//! │  │  FSM · LinkSupervisor · CadenceTracker · Decision      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cadencegate::adapters::json_sink::JsonLinesSink;
use cadencegate::adapters::log_sink::LogEventSink;
use cadencegate::adapters::sim_gate::SimulatedGate;
use cadencegate::adapters::sim_sensor::{SimSensorHandle, SimulatedCadenceSensor};
use cadencegate::adapters::time::MonotonicClock;
use cadencegate::app::runner::{MonitorPorts, ShutdownHandle, run_blocking};
use cadencegate::app::service::MonitorService;
use cadencegate::config::MonitorConfig;
use cadencegate::error::{ConfigError, StartupError};

/// Notification period of the simulated sensor.
const SIM_NOTIFY_PERIOD: Duration = Duration::from_secs(1);

// ── Logging ───────────────────────────────────────────────────

fn init_logging() {
    // RUST_LOG wins, then LOG_LEVEL, then info.
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ── Simulated ride ────────────────────────────────────────────

/// Parse `rpm:secs,rpm:secs,...` into ride segments.
fn parse_profile(raw: &str) -> Result<Vec<(u32, Duration)>> {
    let mut segments = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((rpm, secs)) = part.split_once(':') else {
            bail!("profile segment '{part}' is not rpm:secs");
        };
        let rpm: u32 = rpm.trim().parse().with_context(|| format!("bad rpm in '{part}'"))?;
        let secs: u64 = secs.trim().parse().with_context(|| format!("bad duration in '{part}'"))?;
        segments.push((rpm, Duration::from_secs(secs)));
    }
    Ok(segments)
}

/// Replay the ride profile on the simulated sensor, looping, until
/// shutdown.
fn spawn_ride(handle: SimSensorHandle, profile: Vec<(u32, Duration)>, shutdown: ShutdownHandle) {
    if profile.is_empty() {
        return;
    }
    std::thread::spawn(move || {
        'ride: loop {
            for &(rpm, hold) in &profile {
                info!("SIM: rider cadence -> {} RPM for {}s", rpm, hold.as_secs());
                handle.set_cadence(rpm);
                let deadline = std::time::Instant::now() + hold;
                while std::time::Instant::now() < deadline {
                    if shutdown.is_requested() {
                        break 'ride;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });
}

/// Route SIGINT/SIGTERM to the monitor's shutdown path so the sensor is
/// released and the fail-safe block runs before exit.
fn install_signal_handler(shutdown: &ShutdownHandle) -> Result<()> {
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        handle.request();
    })
    .context("installing signal handler")
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging();

    info!("╔══════════════════════════════════════╗");
    info!("║  CadenceGate v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration (fatal on error) ─────────────────────
    let config = MonitorConfig::load()
        .map_err(StartupError::from)
        .context("loading configuration")?;
    config
        .validate()
        .map_err(StartupError::from)
        .context("invalid configuration")?;
    config.log_summary();

    let auth = config
        .gate
        .auth
        .clone()
        .ok_or(StartupError::Config(ConfigError::MissingCredential("gate.auth")))?;

    // ── 2. Adapters ───────────────────────────────────────────
    let rule_id = config.gate.rule_id.clone().unwrap_or_else(|| "sim-rule-1".into());
    let mut gate = SimulatedGate::new(auth, config.gate_timeout()).with_rule(
        &rule_id,
        &config.gate.rule_name,
        true,
    );

    let initial_rpm = match std::env::var("SIM_CADENCE_RPM") {
        Ok(v) => v.trim().parse().context("SIM_CADENCE_RPM")?,
        Err(_) => 75,
    };
    let mut sensor = SimulatedCadenceSensor::new(initial_rpm, SIM_NOTIFY_PERIOD);
    let profile = parse_profile(&std::env::var("SIM_PROFILE").unwrap_or_default())
        .context("SIM_PROFILE")?;

    let mut sink = (LogEventSink::new(), JsonLinesSink::new(std::io::stdout()));
    let clock = MonotonicClock::new();
    let shutdown = ShutdownHandle::new();

    let run_limit = match std::env::var("CADENCE_RUN_SECS") {
        Ok(v) => Some(Duration::from_secs(v.trim().parse().context("CADENCE_RUN_SECS")?)),
        Err(_) => None,
    };

    // ── 3. Startup: resolve rule, seed decision ───────────────
    let mut service = MonitorService::new(&config);
    service
        .startup(&mut gate, &mut sink)
        .context("gate startup")?;

    install_signal_handler(&shutdown)?;
    spawn_ride(sensor.handle(), profile, shutdown.clone());

    // ── 4. Monitor loop ───────────────────────────────────────
    run_blocking(
        &mut service,
        MonitorPorts {
            transport: &mut sensor,
            gate: &mut gate,
            sink: &mut sink,
            clock: &clock,
        },
        config.tick_period(),
        &shutdown,
        run_limit,
    );

    info!("CadenceGate exiting after {}s", clock.uptime_secs());
    Ok(())
}
