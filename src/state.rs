//! Shared per-port state published by the poll loop
//!
//! Each declared port has one cell holding its mode, last raw reading,
//! publish timestamp, and validity flag. The cells are plain atomics so a
//! foreground read never blocks, whatever the poll thread or a critical
//! section is doing. The poll loop is the sole writer of the reading
//! fields; the mode field is written only under the suspend gate.

use crate::catalog::{MOTOR_OFF, ModeId, PORT_OFF};
use crate::port::{MOTOR_PORT_COUNT, Port, SENSOR_PORT_COUNT};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of a port's latest published reading
#[derive(Debug, Clone, Copy)]
pub struct RawReading {
    /// Last raw value copied out of the bus (stale if `valid` is false)
    pub value: i32,
    /// False until the first successful refresh, and after a failed one
    pub valid: bool,
    /// Age of the last successful publish
    pub age: Duration,
}

pub(crate) struct PortCell {
    mode: AtomicU8,
    raw: AtomicI32,
    updated_us: AtomicU64,
    valid: AtomicBool,
}

impl PortCell {
    fn new(initial_mode: ModeId) -> Self {
        Self {
            mode: AtomicU8::new(initial_mode.raw()),
            raw: AtomicI32::new(0),
            updated_us: AtomicU64::new(0),
            valid: AtomicBool::new(false),
        }
    }

    /// Publish a fresh reading. `valid` is the publish flag: it is stored
    /// last with Release so readers that observe it see the new value.
    pub(crate) fn publish(&self, value: i32, now_us: u64) {
        self.raw.store(value, Ordering::Relaxed);
        self.updated_us.store(now_us, Ordering::Relaxed);
        self.valid.store(true, Ordering::Release);
    }

    /// Mark the cell stale, keeping the last raw value available
    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub(crate) fn set_mode(&self, mode: ModeId) {
        self.mode.store(mode.raw(), Ordering::Release);
    }

    pub(crate) fn mode(&self) -> ModeId {
        ModeId::from_raw(self.mode.load(Ordering::Acquire))
    }

    pub(crate) fn read(&self, now_us: u64) -> RawReading {
        let valid = self.valid.load(Ordering::Acquire);
        let value = self.raw.load(Ordering::Relaxed);
        let updated_us = self.updated_us.load(Ordering::Relaxed);
        RawReading {
            value,
            valid,
            age: Duration::from_micros(now_us.saturating_sub(updated_us)),
        }
    }
}

/// Fixed table of cells for every declared port; lives for the session
pub(crate) struct PortTable {
    sensors: [PortCell; SENSOR_PORT_COUNT],
    motors: [PortCell; MOTOR_PORT_COUNT],
    epoch: Instant,
}

impl PortTable {
    pub(crate) fn new() -> Self {
        Self {
            sensors: std::array::from_fn(|_| PortCell::new(PORT_OFF)),
            motors: std::array::from_fn(|_| PortCell::new(MOTOR_OFF)),
            epoch: Instant::now(),
        }
    }

    pub(crate) fn cell(&self, port: Port) -> &PortCell {
        match port {
            Port::Sensor(p) => &self.sensors[p.index()],
            Port::Motor(p) => &self.motors[p.index()],
        }
    }

    /// Microseconds since the session epoch, the timestamp base for cells
    pub(crate) fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EV3_COLOR;
    use crate::port::SensorPort;

    #[test]
    fn test_cell_starts_invalid() {
        let table = PortTable::new();
        let cell = table.cell(Port::Sensor(SensorPort::new(0).unwrap()));
        let reading = cell.read(table.now_us());
        assert!(!reading.valid);
        assert_eq!(reading.value, 0);
    }

    #[test]
    fn test_publish_then_invalidate_keeps_value() {
        let table = PortTable::new();
        let cell = table.cell(Port::Sensor(SensorPort::new(2).unwrap()));

        cell.publish(42, table.now_us());
        let reading = cell.read(table.now_us());
        assert!(reading.valid);
        assert_eq!(reading.value, 42);

        cell.invalidate();
        let reading = cell.read(table.now_us());
        assert!(!reading.valid);
        assert_eq!(reading.value, 42);
    }

    #[test]
    fn test_age_grows_from_publish_time() {
        let table = PortTable::new();
        let cell = table.cell(Port::Sensor(SensorPort::new(1).unwrap()));

        cell.publish(7, 1_000);
        let reading = cell.read(251_000);
        assert_eq!(reading.age, Duration::from_micros(250_000));
    }

    #[test]
    fn test_mode_round_trip() {
        let table = PortTable::new();
        let cell = table.cell(Port::Sensor(SensorPort::new(0).unwrap()));
        assert_eq!(cell.mode(), PORT_OFF);
        cell.set_mode(EV3_COLOR);
        assert_eq!(cell.mode(), EV3_COLOR);
    }
}
