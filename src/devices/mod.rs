//! Per-port device handles
//!
//! A handle is bound to one port for its lifetime and translates domain
//! operations into bus configuration and state-table reads, going through
//! the session's suspend gate for anything multi-step. Releasing a handle
//! (explicitly or by drop) leaves the device in a neutral state on every
//! exit path.

mod color_sensor;
mod motor;

pub use color_sensor::ColorSensor;
pub use motor::{MAX_POWER, MIN_POWER, Motor, MotorGroup};
