//! Color sensor handle for the NXT and EV3 sensor generations

use crate::catalog::{self, Color, Family, LAMP_RING, Lamp, LogicalMode, ModeId};
use crate::error::{Error, Result};
use crate::port::{Port, SensorPort};
use crate::session::SessionShared;
use crate::state::RawReading;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Handle to a color sensor bound to one port for its lifetime
///
/// The two sensor generations have disjoint mode sets; operations a
/// generation cannot perform fail with `UnsupportedMode` instead of
/// silently doing nothing.
pub struct ColorSensor {
    shared: Arc<SessionShared>,
    port: SensorPort,
    family: Family,
    closed: bool,
}

impl ColorSensor {
    pub(crate) fn new(shared: Arc<SessionShared>, family: Family, port: u8) -> Result<Self> {
        if family == Family::Motor {
            return Err(Error::UnknownFamily(family.to_string()));
        }
        let port = SensorPort::new(port)?;
        log::debug!("Sensor: creating {} color sensor on port {}", family, port);
        Ok(Self {
            shared,
            port,
            family,
            closed: false,
        })
    }

    /// The bound port
    pub fn port(&self) -> SensorPort {
        self.port
    }

    /// The bound sensor generation
    pub fn family(&self) -> Family {
        self.family
    }

    fn bus_port(&self) -> Port {
        Port::Sensor(self.port)
    }

    fn write_mode(&self, id: ModeId) -> Result<()> {
        log::debug!(
            "Sensor: port {} -> {}",
            self.port,
            catalog::descriptor(id).unwrap_or("unknown mode")
        );
        self.shared.write_mode(self.bus_port(), id)
    }

    /// Map a logical measurement request onto this sensor's generation
    /// and reconfigure the port
    ///
    /// Holds the suspend gate for the whole bus call, which can take
    /// seconds; mode changes are rare and expensive, never a hot path.
    pub fn set_mode(&self, mode: LogicalMode) -> Result<()> {
        let id = mode.mode_for(self.family).ok_or(Error::UnsupportedMode {
            family: self.family,
            mode: mode.name(),
        })?;
        self.write_mode(id)
    }

    /// Select the illumination LED; only the NXT generation has one
    pub fn set_lamp(&self, lamp: Lamp) -> Result<()> {
        if self.family != Family::Nxt {
            return Err(Error::UnsupportedMode {
                family: self.family,
                mode: lamp.name(),
            });
        }
        self.write_mode(lamp.mode())
    }

    /// Advance the lamp ring (off, red, green, blue) with wraparound
    ///
    /// A sensor not currently in a ring mode enters the ring at its first
    /// entry.
    pub fn cycle_lamp(&self) -> Result<()> {
        if self.family != Family::Nxt {
            return Err(Error::UnsupportedMode {
                family: self.family,
                mode: "lamp cycling",
            });
        }
        let current = self.shared.mode_of(self.bus_port());
        let next = match LAMP_RING.iter().position(|&mode| mode == current) {
            Some(i) => LAMP_RING[(i + 1) % LAMP_RING.len()],
            None => LAMP_RING[0],
        };
        self.write_mode(next)
    }

    /// Latest color label
    ///
    /// Stale samples and raw values outside the 8-entry label table are
    /// reported as `Unreadable`, never defaulted. An unreadable call does
    /// not disable the handle for future reads.
    pub fn read_color(&self) -> Result<Color> {
        let reading = self.shared.read(self.bus_port());
        if !reading.valid {
            return Err(Error::Unreadable("no valid sample for port"));
        }
        Color::from_raw(reading.value).ok_or(Error::Unreadable("raw value outside color table"))
    }

    /// Latest raw snapshot; never blocks, never waits for a fresh sample
    pub fn reading(&self) -> RawReading {
        self.shared.read(self.bus_port())
    }

    /// Current mode as `(descriptor, id)`
    pub fn current_mode(&self) -> (&'static str, ModeId) {
        let id = self.shared.mode_of(self.bus_port());
        (catalog::descriptor(id).unwrap_or("unknown mode"), id)
    }

    /// Block until the sensor reads `color` or `timeout` expires
    ///
    /// Unreadable samples are tolerated while waiting; a sensor that
    /// never becomes readable times out like any other mismatch.
    pub fn wait_for_color(&self, color: Color, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.read_color().is_ok_and(|c| c == color) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            thread::sleep(
                self.shared
                    .poll_interval
                    .min(deadline.saturating_duration_since(now)),
            );
        }
    }

    /// Return the port to its neutral mode and release the handle
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let neutral = catalog::neutral_mode(self.family);
        self.shared
            .write_mode_timeout(self.bus_port(), neutral, self.shared.close_timeout)
    }
}

impl Drop for ColorSensor {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Sensor: failed to neutralize port {} on drop: {}", self.port, e);
        }
    }
}
