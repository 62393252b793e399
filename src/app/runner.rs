//! Async monitor loop and shutdown handling.
//!
//! The loop ticks the [`MonitorService`] and sleeps on an `async-io-mini`
//! reactor timer between ticks, raced against a shutdown signal so a stop
//! request never waits out a full tick period.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                      │
//!  │  ┌────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                  │  │
//!  │  │  ┌──────────────┐      ┌────────────────────┐  │  │
//!  │  │  │ monitor loop │      │ run limit (opt.)   │  │  │
//!  │  │  │ tick ⏱ / stop│◀─────│ request shutdown   │  │  │
//!  │  │  └──────────────┘      └────────────────────┘  │  │
//!  │  └────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::info;

use super::ports::{Clock, EventSink, GatePort, SensorTransport};
use super::service::MonitorService;

// ── Shutdown ─────────────────────────────────────────────────

struct ShutdownInner {
    requested: AtomicBool,
    signal: Signal<CriticalSectionRawMutex, ()>,
}

/// Clonable stop request, safe to trigger from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownInner>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                requested: AtomicBool::new(false),
                signal: Signal::new(),
            }),
        }
    }

    pub fn request(&self) {
        if !self.inner.requested.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested");
        }
        self.inner.signal.signal(());
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Resolves once [`request`](Self::request) has been called.
    pub async fn wait(&self) {
        while !self.is_requested() {
            self.inner.signal.wait().await;
        }
    }
}

// ── Loop ─────────────────────────────────────────────────────

/// Everything the loop drives, bundled so the call site stays readable.
pub struct MonitorPorts<'a, T, G, S, C> {
    pub transport: &'a mut T,
    pub gate: &'a mut G,
    pub sink: &'a mut S,
    pub clock: &'a C,
}

/// Tick until shutdown is requested, then stop the service.
pub async fn run_monitor<T, G, S, C>(
    service: &mut MonitorService,
    ports: MonitorPorts<'_, T, G, S, C>,
    tick_period: Duration,
    shutdown: &ShutdownHandle,
) where
    T: SensorTransport,
    G: GatePort,
    S: EventSink,
    C: Clock,
{
    let MonitorPorts {
        transport,
        gate,
        sink,
        clock,
    } = ports;

    info!("Monitor loop running ({}ms tick)", tick_period.as_millis());

    while !shutdown.is_requested() {
        service.tick(clock.now(), transport, gate, sink);

        let stop = futures_lite::future::or(
            async {
                shutdown.wait().await;
                true
            },
            async {
                async_io_mini::Timer::after(tick_period).await;
                false
            },
        )
        .await;
        if stop {
            break;
        }
    }

    service.shutdown(clock.now(), transport, gate, sink);
}

/// Drive [`run_monitor`] to completion on a local executor, optionally
/// stopping after `run_limit`.
pub fn run_blocking<T, G, S, C>(
    service: &mut MonitorService,
    ports: MonitorPorts<'_, T, G, S, C>,
    tick_period: Duration,
    shutdown: &ShutdownHandle,
    run_limit: Option<Duration>,
) where
    T: SensorTransport,
    G: GatePort,
    S: EventSink,
    C: Clock,
{
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    if let Some(limit) = run_limit {
        let handle = shutdown.clone();
        executor
            .spawn(async move {
                async_io_mini::Timer::after(limit).await;
                info!("Run limit of {}s reached", limit.as_secs());
                handle.request();
            })
            .detach();
    }

    futures_lite::future::block_on(executor.run(run_monitor(service, ports, tick_period, shutdown)));
}
