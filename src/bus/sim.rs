//! Simulated bus for hardware-free testing
//!
//! Deterministic and fully scripted: staged sensor values become visible
//! only after a refresh, like the real transport, and every register
//! write is logged with the refresh count at write time so tests can
//! check ordering against the poll loop.

use super::DeviceBus;
use crate::catalog::ModeId;
use crate::error::{Error, Result};
use crate::port::{MOTOR_PORT_COUNT, MotorPort, Port, SENSOR_PORT_COUNT, SensorPort};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// One speed-register write, stamped with the refresh count at write time
#[derive(Debug, Clone, Copy)]
pub struct SpeedEvent {
    /// Motor port written
    pub port: MotorPort,
    /// Value written
    pub value: i16,
    /// Number of refreshes completed when the write landed
    pub at_refresh: u64,
}

struct SimBusInner {
    staged: [i32; SENSOR_PORT_COUNT],
    latched: [i32; SENSOR_PORT_COUNT],
    encoders: [i32; MOTOR_PORT_COUNT],
    speeds: [i16; MOTOR_PORT_COUNT],
    configure_log: Vec<(Port, ModeId)>,
    speed_events: Vec<SpeedEvent>,
    refresh_count: u64,
    fail_refreshes: u32,
    fail_configures: u32,
    configure_delay: Duration,
}

/// Scripted in-memory bus
#[derive(Clone)]
pub struct SimBus {
    inner: Arc<Mutex<SimBusInner>>,
}

impl SimBus {
    /// Create a simulated bus with all values zero
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimBusInner {
                staged: [0; SENSOR_PORT_COUNT],
                latched: [0; SENSOR_PORT_COUNT],
                encoders: [0; MOTOR_PORT_COUNT],
                speeds: [0; MOTOR_PORT_COUNT],
                configure_log: Vec::new(),
                speed_events: Vec::new(),
                refresh_count: 0,
                fail_refreshes: 0,
                fail_configures: 0,
                configure_delay: Duration::ZERO,
            })),
        }
    }

    /// Stage a sensor value; visible to readers after the next refresh
    pub fn set_sensor_raw(&self, port: SensorPort, value: i32) {
        self.inner.lock().staged[port.index()] = value;
    }

    /// Number of completed refresh passes
    pub fn refresh_count(&self) -> u64 {
        self.inner.lock().refresh_count
    }

    /// Current value of a motor's speed register
    pub fn speed(&self, port: MotorPort) -> i16 {
        self.inner.lock().speeds[port.index()]
    }

    /// Every speed-register write so far, oldest first
    pub fn speed_events(&self) -> Vec<SpeedEvent> {
        self.inner.lock().speed_events.clone()
    }

    /// Every successful configure call so far, oldest first
    pub fn configure_log(&self) -> Vec<(Port, ModeId)> {
        self.inner.lock().configure_log.clone()
    }

    /// Mode most recently configured on `port`
    pub fn last_mode(&self, port: Port) -> Option<ModeId> {
        self.inner
            .lock()
            .configure_log
            .iter()
            .rev()
            .find(|(p, _)| *p == port)
            .map(|(_, mode)| *mode)
    }

    /// Fail the next `n` refresh calls
    pub fn fail_refreshes(&self, n: u32) {
        self.inner.lock().fail_refreshes = n;
    }

    /// Fail the next `n` configure calls
    pub fn fail_configures(&self, n: u32) {
        self.inner.lock().fail_configures = n;
    }

    /// Latency added to every configure call (the real one can take
    /// seconds)
    pub fn set_configure_delay(&self, delay: Duration) {
        self.inner.lock().configure_delay = delay;
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBus for SimBus {
    fn refresh_all(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_refreshes > 0 {
            inner.fail_refreshes -= 1;
            return Err(Error::Bus("simulated refresh failure".to_string()));
        }
        inner.latched = inner.staged;
        // Toy encoder: integrate the speed register once per refresh
        for i in 0..MOTOR_PORT_COUNT {
            inner.encoders[i] += inner.speeds[i] as i32;
        }
        inner.refresh_count += 1;
        Ok(())
    }

    fn configure(&self, port: Port, mode: ModeId) -> Result<()> {
        let delay = {
            let mut inner = self.inner.lock();
            if inner.fail_configures > 0 {
                inner.fail_configures -= 1;
                return Err(Error::Bus("simulated configure failure".to_string()));
            }
            inner.configure_log.push((port, mode));
            inner.configure_delay
        };
        // Sleep outside the lock so register accesses stay non-blocking
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn set_speed(&self, port: MotorPort, value: i16) {
        let mut inner = self.inner.lock();
        inner.speeds[port.index()] = value;
        let at_refresh = inner.refresh_count;
        inner.speed_events.push(SpeedEvent {
            port,
            value,
            at_refresh,
        });
    }

    fn raw_value(&self, port: Port) -> i32 {
        let inner = self.inner.lock();
        match port {
            Port::Sensor(p) => inner.latched[p.index()],
            Port::Motor(p) => inner.encoders[p.index()],
        }
    }
}
