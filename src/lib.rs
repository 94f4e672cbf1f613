//! SetuIO - Hardware session manager for polled brick buses
//!
//! A single background poll loop refreshes every port of a brick bus on a
//! fixed cadence while foreground device handles read the published state
//! without blocking. When a handle must reconfigure a port or drive
//! several motors in lockstep, it suspends the loop through a gate that
//! admits exactly one critical section at a time, and polling resumes
//! automatically when the critical section ends - on error paths too.
//!
//! ## Features
//!
//! - `mock`: expose the deterministic [`bus::SimBus`] for hardware-free
//!   integration
//!
//! ## Example
//!
//! ```no_run
//! use setu_io::{Family, LogicalMode, Session, SessionConfig};
//! use std::time::Duration;
//! # struct NullBus;
//! # impl setu_io::bus::DeviceBus for NullBus {
//! #     fn refresh_all(&self) -> setu_io::Result<()> { Ok(()) }
//! #     fn configure(&self, _: setu_io::Port, _: setu_io::ModeId) -> setu_io::Result<()> { Ok(()) }
//! #     fn set_speed(&self, _: setu_io::MotorPort, _: i16) {}
//! #     fn raw_value(&self, _: setu_io::Port) -> i32 { 0 }
//! # }
//! # fn open_bus() -> NullBus { NullBus }
//!
//! # fn main() -> setu_io::Result<()> {
//! let session = Session::start(open_bus(), &SessionConfig::default())?;
//!
//! let sensor = session.color_sensor(Family::Ev3, 0)?;
//! sensor.set_mode(LogicalMode::Color)?;
//! println!("color: {:?}", sensor.read_color()?);
//!
//! let motor = session.motor(0)?;
//! motor.go_forward(Duration::from_secs(1));
//! motor.stop(false)?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod catalog;
pub mod config;
pub mod devices;
pub mod error;
pub mod port;
pub mod session;

mod gate;
mod state;

// Re-export commonly used types
pub use catalog::{Color, Family, Lamp, LogicalMode, ModeId};
pub use config::{AppConfig, SessionConfig};
pub use devices::{ColorSensor, Motor, MotorGroup};
pub use error::{Error, Result};
pub use port::{MotorPort, Port, SensorPort};
pub use session::{PollStats, Session};
pub use state::RawReading;
