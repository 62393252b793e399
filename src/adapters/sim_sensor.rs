//! Simulated CSC cadence sensor.
//!
//! Host-side stand-in for a BLE crank sensor.  After subscribe, a worker
//! thread integrates the target cadence into cumulative crank counters and
//! pushes encoded CSC measurement frames through the [`FrameSender`] at a
//! fixed notification period, the way a real sensor notifies about once
//! per second.
//!
//! Like real hardware, a stopped crank keeps repeating the last counters,
//! so the decoder sees no new events.  A [`SimSensorHandle`] scripts
//! cadence changes, link drops, and failed connects from any thread.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info};

use crate::app::ports::SensorTransport;
use crate::error::SensorError;
use crate::inbox::FrameSender;
use crate::sensors::csc::{TICKS_PER_MINUTE, crank_frame};

struct SimControl {
    cadence_rpm: AtomicU32,
    link_up: AtomicBool,
    connect_failures: AtomicU32,
    streaming: AtomicBool,
}

/// Remote control for a [`SimulatedCadenceSensor`].
#[derive(Clone)]
pub struct SimSensorHandle {
    control: Arc<SimControl>,
}

impl SimSensorHandle {
    /// Change the simulated cadence.
    pub fn set_cadence(&self, rpm: u32) {
        self.control.cadence_rpm.store(rpm, Ordering::Relaxed);
    }

    pub fn cadence(&self) -> u32 {
        self.control.cadence_rpm.load(Ordering::Relaxed)
    }

    /// Simulate the radio link going away.
    pub fn drop_link(&self) {
        info!("SIM: sensor link dropped");
        self.control.link_up.store(false, Ordering::Release);
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.control.connect_failures.store(n, Ordering::Relaxed);
    }
}

/// Crank counters integrated from a cadence.
#[derive(Debug, Clone, Copy, Default)]
struct CrankModel {
    /// Total revolutions, fractional.
    revolutions: f64,
    /// Elapsed time in 1/1024 s ticks.
    ticks: f64,
    /// Counters of the last completed revolution.
    last_event: (u16, u16),
}

impl CrankModel {
    /// Advance by `dt` at `rpm` and return the counters to report.
    fn advance(&mut self, dt: Duration, rpm: u32) -> (u16, u16) {
        let dt_ticks = dt.as_secs_f64() * 1024.0;
        let before = self.revolutions.floor();
        self.ticks += dt_ticks;
        self.revolutions += f64::from(rpm) * dt_ticks / f64::from(TICKS_PER_MINUTE);

        let whole = self.revolutions.floor();
        if whole > before && rpm > 0 {
            // Back-date the event to when the last revolution completed.
            let frac = self.revolutions - whole;
            let ticks_per_rev = f64::from(TICKS_PER_MINUTE) / f64::from(rpm);
            let event_ticks = self.ticks - frac * ticks_per_rev;
            self.last_event = (
                (whole as u64 % 65_536) as u16,
                (event_ticks.max(0.0) as u64 % 65_536) as u16,
            );
        }
        self.last_event
    }
}

/// Thread-backed simulated sensor.
pub struct SimulatedCadenceSensor {
    control: Arc<SimControl>,
    notify_period: Duration,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedCadenceSensor {
    pub fn new(initial_rpm: u32, notify_period: Duration) -> Self {
        Self {
            control: Arc::new(SimControl {
                cadence_rpm: AtomicU32::new(initial_rpm),
                link_up: AtomicBool::new(false),
                connect_failures: AtomicU32::new(0),
                streaming: AtomicBool::new(false),
            }),
            notify_period,
            worker: None,
        }
    }

    pub fn handle(&self) -> SimSensorHandle {
        SimSensorHandle {
            control: Arc::clone(&self.control),
        }
    }

    fn stop_worker(&mut self) {
        self.control.streaming.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl SensorTransport for SimulatedCadenceSensor {
    fn connect(&mut self) -> Result<(), SensorError> {
        let failures = self.control.connect_failures.load(Ordering::Relaxed);
        if failures > 0 {
            self.control
                .connect_failures
                .store(failures - 1, Ordering::Relaxed);
            return Err(SensorError::ConnectFailed);
        }
        self.control.link_up.store(true, Ordering::Release);
        info!("SIM: sensor connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.control.link_up.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, frames: FrameSender) -> Result<(), SensorError> {
        if !self.is_connected() {
            return Err(SensorError::SubscribeFailed);
        }
        self.stop_worker();
        self.control.streaming.store(true, Ordering::Release);

        let control = Arc::clone(&self.control);
        let period = self.notify_period;
        let worker = std::thread::Builder::new()
            .name("sim-csc".into())
            .spawn(move || notify_loop(&control, &frames, period))
            .map_err(|_| SensorError::SubscribeFailed)?;
        self.worker = Some(worker);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stop_worker();
        self.control.link_up.store(false, Ordering::Release);
    }
}

impl Drop for SimulatedCadenceSensor {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn notify_loop(control: &SimControl, frames: &FrameSender, period: Duration) {
    let mut model = CrankModel::default();
    debug!("SIM: notification thread started ({}ms)", period.as_millis());
    while control.streaming.load(Ordering::Acquire) && frames.is_open() {
        std::thread::sleep(period);
        if !control.link_up.load(Ordering::Acquire) {
            continue;
        }
        let rpm = control.cadence_rpm.load(Ordering::Relaxed);
        let (revs, event_time) = model.advance(period, rpm);
        frames.send(&crank_frame(revs, event_time));
    }
    debug!("SIM: notification thread stopped");
}
