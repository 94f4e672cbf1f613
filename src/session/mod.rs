//! Hardware session: shared port state, suspend gate, poll lifecycle
//!
//! One [`Session`] owns the background poll thread and the per-port state
//! table. Device handles are created from it and share the underlying
//! state through an `Arc`, so a handle stays usable for cleanup even
//! after the session itself has been shut down.

mod poll;

use crate::bus::DeviceBus;
use crate::catalog::{Family, ModeId};
use crate::config::SessionConfig;
use crate::devices::{ColorSensor, Motor};
use crate::error::Result;
use crate::gate::SuspendGate;
use crate::port::{self, Port};
use crate::state::{PortTable, RawReading};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Poll loop counters, lock-free like the rest of the shared state
#[derive(Default)]
pub(crate) struct PollCounters {
    pub(crate) cycles: AtomicU64,
    pub(crate) refresh_failures: AtomicU64,
    pub(crate) consecutive_failures: AtomicU32,
}

/// Snapshot of the poll loop counters
#[derive(Debug, Clone, Copy)]
pub struct PollStats {
    /// Completed poll cycles, including skipped ones
    pub cycles: u64,
    /// Total failed refresh calls since start
    pub refresh_failures: u64,
    /// Failed refreshes since the last success
    pub consecutive_failures: u32,
}

/// State shared between the session, its poll thread, and device handles
pub(crate) struct SessionShared {
    pub(crate) bus: Box<dyn DeviceBus>,
    pub(crate) table: PortTable,
    pub(crate) gate: SuspendGate,
    pub(crate) polling_enabled: AtomicBool,
    pub(crate) shutdown: AtomicBool,
    pub(crate) poll_interval: Duration,
    pub(crate) close_timeout: Duration,
    pub(crate) counters: PollCounters,
}

impl SessionShared {
    /// One refresh pass: bus refresh, then publish or invalidate every
    /// declared port
    pub(crate) fn refresh_and_publish(&self) -> Result<()> {
        match self.bus.refresh_all() {
            Ok(()) => {
                let now_us = self.table.now_us();
                for port in port::all_ports() {
                    self.table.cell(port).publish(self.bus.raw_value(port), now_us);
                }
                Ok(())
            }
            Err(e) => {
                // Stale-but-available beats blocking readers: keep the old
                // raw values, only drop the validity flag
                for port in port::all_ports() {
                    self.table.cell(port).invalidate();
                }
                Err(e)
            }
        }
    }

    /// Configure a port and record the new mode. Holds the gate for the
    /// whole bus call; configuration can take seconds on real hardware,
    /// so this never belongs on a hot path.
    pub(crate) fn write_mode(&self, port: Port, mode: ModeId) -> Result<()> {
        let _token = self.gate.acquire();
        self.bus.configure(port, mode)?;
        self.table.cell(port).set_mode(mode);
        Ok(())
    }

    /// [`write_mode`](Self::write_mode) with a bounded gate wait, for
    /// cleanup paths that must not hang
    pub(crate) fn write_mode_timeout(
        &self,
        port: Port,
        mode: ModeId,
        timeout: Duration,
    ) -> Result<()> {
        let _token = self.gate.acquire_timeout(timeout)?;
        self.bus.configure(port, mode)?;
        self.table.cell(port).set_mode(mode);
        Ok(())
    }

    /// One immediate gated refresh, for callers that must observe an
    /// effect without waiting out a poll tick
    pub(crate) fn force_refresh(&self) -> Result<()> {
        let _token = self.gate.acquire();
        self.refresh_and_publish()
    }

    /// Latest published snapshot for a port; never blocks
    pub(crate) fn read(&self, port: Port) -> RawReading {
        self.table.cell(port).read(self.table.now_us())
    }

    pub(crate) fn mode_of(&self, port: Port) -> ModeId {
        self.table.cell(port).mode()
    }
}

/// Hardware session manager
///
/// Owns the poll loop refreshing every port on a fixed cadence and hands
/// out per-port device handles. Exactly one session runs per bus.
pub struct Session {
    shared: Arc<SessionShared>,
    poll_thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Start a session over `bus` and launch the poll thread
    pub fn start<B: DeviceBus + 'static>(bus: B, config: &SessionConfig) -> Result<Self> {
        let shared = Arc::new(SessionShared {
            bus: Box::new(bus),
            table: PortTable::new(),
            gate: SuspendGate::new(),
            polling_enabled: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            poll_interval: config.poll_interval(),
            close_timeout: config.close_timeout(),
            counters: PollCounters::default(),
        });

        let poll_thread = Some(poll::spawn_poll_thread(Arc::clone(&shared))?);
        log::info!(
            "Session: started (poll interval {:?})",
            shared.poll_interval
        );

        Ok(Self {
            shared,
            poll_thread,
        })
    }

    /// Create a color sensor handle bound to `port` for its lifetime
    ///
    /// Fails with `InvalidPort` for a port outside 0..=3 and with
    /// `UnknownFamily` for a family that is not a sensor generation.
    pub fn color_sensor(&self, family: Family, port: u8) -> Result<ColorSensor> {
        ColorSensor::new(Arc::clone(&self.shared), family, port)
    }

    /// Create a motor handle bound to `port` (0..=3 for A..D), enabling
    /// the motor on the bus
    pub fn motor(&self, port: u8) -> Result<Motor> {
        Motor::new(Arc::clone(&self.shared), port)
    }

    /// Toggle background refreshes; takes effect at the next cycle
    pub fn set_polling_enabled(&self, enabled: bool) {
        self.shared.polling_enabled.store(enabled, Ordering::Relaxed);
        log::debug!(
            "Session: polling {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Snapshot of the poll loop counters
    pub fn poll_stats(&self) -> PollStats {
        PollStats {
            cycles: self.shared.counters.cycles.load(Ordering::Relaxed),
            refresh_failures: self
                .shared
                .counters
                .refresh_failures
                .load(Ordering::Relaxed),
            consecutive_failures: self
                .shared
                .counters
                .consecutive_failures
                .load(Ordering::Relaxed),
        }
    }

    /// Stop the poll thread permanently. Handles created from this
    /// session remain usable for cleanup.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_poll_thread();
        Ok(())
    }

    fn stop_poll_thread(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.poll_thread.take()
            && handle.join().is_err()
        {
            log::error!("Session: poll thread panicked");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.poll_thread.is_some() {
            log::info!("Session: shutting down");
            self.stop_poll_thread();
        }
    }
}
