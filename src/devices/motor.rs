//! Motor handle and grouped lockstep control

use crate::catalog::{MOTOR_OFF, MOTOR_ON};
use crate::error::{Error, Result};
use crate::port::{MotorPort, Port};
use crate::session::SessionShared;
use crate::state::RawReading;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Lowest accepted power, matching the firmware's signed speed register
pub const MIN_POWER: i16 = -255;

/// Highest accepted power
pub const MAX_POWER: i16 = 254;

/// Power applied to a fresh motor before the caller sets its own
const DEFAULT_POWER: i16 = 200;

/// Handle to a motor bound to one port for its lifetime
///
/// Speed writes are buffered register accesses, safe to interleave with
/// polling, so driving is the hot path and goes straight to the bus.
/// Releasing the handle always leaves the speed register at zero.
pub struct Motor {
    shared: Arc<SessionShared>,
    port: MotorPort,
    power: i16,
    closed: bool,
}

impl Motor {
    pub(crate) fn new(shared: Arc<SessionShared>, port: u8) -> Result<Self> {
        let port = MotorPort::new(port)?;
        shared.write_mode(Port::Motor(port), MOTOR_ON)?;
        log::debug!("Motor: enabled on port {}", port);
        Ok(Self {
            shared,
            port,
            power: DEFAULT_POWER,
            closed: false,
        })
    }

    /// The bound port
    pub fn port(&self) -> MotorPort {
        self.port
    }

    /// Set the power used by the next drive call
    ///
    /// Fails with `InvalidPower` outside -255..=254 and leaves the
    /// previous setting in place.
    pub fn set_power(&mut self, power: i16) -> Result<()> {
        if !(MIN_POWER..=MAX_POWER).contains(&power) {
            return Err(Error::InvalidPower(power));
        }
        self.power = power;
        Ok(())
    }

    /// The current power setting
    pub fn power(&self) -> i16 {
        self.power
    }

    /// Drive at the set power
    ///
    /// A positive duration blocks the caller for that long and leaves the
    /// motor running; `Duration::ZERO` returns immediately and the caller
    /// manages the stop.
    pub fn go_forward(&self, duration: Duration) {
        self.drive(self.power, duration);
    }

    /// Drive with the power negated; the stored setting is unchanged
    pub fn go_backward(&self, duration: Duration) {
        self.drive(-self.power, duration);
    }

    fn drive(&self, speed: i16, duration: Duration) {
        self.shared.bus.set_speed(self.port, speed);
        if duration > Duration::ZERO {
            thread::sleep(duration);
        }
    }

    /// Zero the speed register
    ///
    /// A hard stop (`coast == false`) forces one immediate refresh so the
    /// stopped state is observed without waiting out a poll tick.
    pub fn stop(&self, coast: bool) -> Result<()> {
        self.shared.bus.set_speed(self.port, 0);
        if !coast {
            self.shared.force_refresh()?;
        }
        Ok(())
    }

    /// Stop and let the motor spin down freely
    pub fn coast(&self) -> Result<()> {
        self.stop(true)
    }

    /// Latest encoder snapshot for this port; never blocks
    pub fn reading(&self) -> RawReading {
        self.shared.read(Port::Motor(self.port))
    }

    /// Zero the speed, disable the motor, and release the handle
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Speed first: it must reach zero even if disabling fails or the
        // gate is congested
        self.shared.bus.set_speed(self.port, 0);
        self.shared
            .write_mode_timeout(Port::Motor(self.port), MOTOR_OFF, self.shared.close_timeout)
    }
}

impl Drop for Motor {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Motor: failed to disable port {} on drop: {}", self.port, e);
        }
    }
}

/// Drives several motors in lockstep
///
/// Grouped writes hold the suspend gate once for all per-motor writes, so
/// the motors start (and stop) within one refresh tick of each other.
/// This is synchronization rather than safety: individual speed writes
/// are already safe against polling.
pub struct MotorGroup {
    motors: Vec<Motor>,
}

impl MotorGroup {
    /// Group previously created motors
    pub fn new(motors: Vec<Motor>) -> Result<Self> {
        if motors.is_empty() {
            return Err(Error::InvalidParameter(
                "motor group needs at least one motor".to_string(),
            ));
        }
        Ok(Self { motors })
    }

    fn shared(&self) -> &SessionShared {
        &self.motors[0].shared
    }

    /// The grouped motors
    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    /// Drive every motor forward at its own power setting
    ///
    /// A positive duration blocks, then stops the whole group (hard stop
    /// or coasting per `coast`); `Duration::ZERO` leaves the group
    /// running.
    pub fn go_forward(&self, duration: Duration, coast: bool) -> Result<()> {
        self.drive(false, duration, coast)
    }

    /// Drive every motor backward
    pub fn go_backward(&self, duration: Duration, coast: bool) -> Result<()> {
        self.drive(true, duration, coast)
    }

    fn drive(&self, backward: bool, duration: Duration, coast: bool) -> Result<()> {
        {
            // One hold for all writes: no refresh can land between the
            // first motor and the last
            let _token = self.shared().gate.acquire();
            for motor in &self.motors {
                let speed = if backward { -motor.power } else { motor.power };
                self.shared().bus.set_speed(motor.port, speed);
            }
        }
        if duration > Duration::ZERO {
            thread::sleep(duration);
            self.stop(coast)?;
        }
        Ok(())
    }

    /// Stop every motor; the zeros are written under one gate hold too
    pub fn stop(&self, coast: bool) -> Result<()> {
        {
            let _token = self.shared().gate.acquire();
            for motor in &self.motors {
                self.shared().bus.set_speed(motor.port, 0);
            }
        }
        if !coast {
            self.shared().force_refresh()?;
        }
        Ok(())
    }

    /// Release the group, disabling every motor
    pub fn close(mut self) -> Result<()> {
        let mut result = Ok(());
        for motor in self.motors.drain(..) {
            if let Err(e) = motor.close()
                && result.is_ok()
            {
                result = Err(e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimBus;
    use crate::config::SessionConfig;
    use crate::session::Session;

    fn start_session() -> (Session, SimBus) {
        let bus = SimBus::new();
        let session = Session::start(
            bus.clone(),
            &SessionConfig {
                poll_interval_ms: 10,
                close_timeout_ms: 1000,
            },
        )
        .unwrap();
        (session, bus)
    }

    fn port(n: u8) -> MotorPort {
        MotorPort::new(n).unwrap()
    }

    #[test]
    fn test_construction_enables_motor() {
        let (session, bus) = start_session();
        let motor = session.motor(0).unwrap();
        assert_eq!(motor.power(), 200);
        assert_eq!(bus.last_mode(Port::Motor(port(0))), Some(MOTOR_ON));

        assert!(matches!(
            session.motor(4),
            Err(Error::InvalidPort { kind: "motor", port: 4 })
        ));
    }

    #[test]
    fn test_set_power_range() {
        let (session, _bus) = start_session();
        let mut motor = session.motor(0).unwrap();

        assert!(matches!(motor.set_power(300), Err(Error::InvalidPower(300))));
        assert!(matches!(
            motor.set_power(-300),
            Err(Error::InvalidPower(-300))
        ));
        // A rejected setting leaves the previous one in place
        assert_eq!(motor.power(), 200);

        motor.set_power(254).unwrap();
        assert_eq!(motor.power(), 254);
        motor.set_power(-255).unwrap();
        assert_eq!(motor.power(), -255);
    }

    #[test]
    fn test_forward_backward_write_signed_speed() {
        let (session, bus) = start_session();
        let mut motor = session.motor(1).unwrap();
        motor.set_power(120).unwrap();

        motor.go_forward(Duration::ZERO);
        assert_eq!(bus.speed(port(1)), 120);

        motor.go_backward(Duration::ZERO);
        assert_eq!(bus.speed(port(1)), -120);
        // The stored setting is unchanged by a backward drive
        assert_eq!(motor.power(), 120);
    }

    #[test]
    fn test_hard_stop_forces_refresh() {
        let (session, bus) = start_session();
        session.set_polling_enabled(false);
        thread::sleep(Duration::from_millis(30));

        let motor = session.motor(0).unwrap();
        motor.go_forward(Duration::ZERO);

        let before = bus.refresh_count();
        motor.stop(false).unwrap();
        assert_eq!(bus.speed(port(0)), 0);
        assert_eq!(bus.refresh_count(), before + 1);

        // Coasting writes the zero but skips the refresh
        motor.go_forward(Duration::ZERO);
        motor.coast().unwrap();
        assert_eq!(bus.speed(port(0)), 0);
        assert_eq!(bus.refresh_count(), before + 1);
    }

    #[test]
    fn test_close_zeroes_speed_even_after_error() {
        let (session, bus) = start_session();
        let motor = session.motor(2).unwrap();
        motor.go_forward(Duration::ZERO);

        // The last operation before release fails at the bus
        bus.fail_refreshes(1);
        assert!(motor.stop(false).is_err());

        motor.go_forward(Duration::ZERO);
        // Disabling will fail too; the speed register must still reach 0
        bus.fail_configures(1);
        drop(motor);
        assert_eq!(bus.speed(port(2)), 0);
    }

    #[test]
    fn test_close_disables_motor() {
        let (session, bus) = start_session();
        let motor = session.motor(3).unwrap();
        motor.go_forward(Duration::ZERO);
        motor.close().unwrap();

        assert_eq!(bus.speed(port(3)), 0);
        assert_eq!(bus.last_mode(Port::Motor(port(3))), Some(MOTOR_OFF));
    }

    #[test]
    fn test_encoder_reading_tracks_drive() {
        let (session, _bus) = start_session();
        let motor = session.motor(1).unwrap();

        motor.go_forward(Duration::ZERO);
        thread::sleep(Duration::from_millis(50));
        motor.stop(true).unwrap();

        let reading = motor.reading();
        assert!(reading.valid);
        assert!(reading.value > 0);
    }

    #[test]
    fn test_group_writes_share_one_gate_hold() {
        let (session, bus) = start_session();
        let mut left = session.motor(0).unwrap();
        let mut right = session.motor(2).unwrap();
        left.set_power(100).unwrap();
        right.set_power(100).unwrap();

        let group = MotorGroup::new(vec![left, right]).unwrap();
        let skip = bus.speed_events().len();
        group.go_forward(Duration::ZERO, false).unwrap();

        // Both writes landed with no refresh between them
        let events = &bus.speed_events()[skip..];
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].at_refresh, events[1].at_refresh);
        assert_eq!(bus.speed(port(0)), 100);
        assert_eq!(bus.speed(port(2)), 100);

        group.stop(true).unwrap();
        assert_eq!(bus.speed(port(0)), 0);
        assert_eq!(bus.speed(port(2)), 0);
        group.close().unwrap();
    }

    #[test]
    fn test_group_drive_with_duration_stops_after() {
        let (session, bus) = start_session();
        let group = MotorGroup::new(vec![session.motor(0).unwrap(), session.motor(1).unwrap()])
            .unwrap();

        group.go_backward(Duration::from_millis(30), true).unwrap();
        assert_eq!(bus.speed(port(0)), 0);
        assert_eq!(bus.speed(port(1)), 0);
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert!(matches!(
            MotorGroup::new(Vec::new()),
            Err(Error::InvalidParameter(_))
        ));
    }
}
