//! Device bus abstraction
//!
//! The bus refreshes every declared port in one pass and exposes the
//! values read back, plus per-port mode and speed registers. Transport
//! framing and checksums live below this seam and are not modeled here.

use crate::catalog::ModeId;
use crate::error::Result;
use crate::port::{MotorPort, Port};

#[cfg(any(test, feature = "mock"))]
mod sim;
#[cfg(any(test, feature = "mock"))]
pub use sim::{SimBus, SpeedEvent};

/// Brick bus collaborator.
///
/// The bus is non-reentrant for its slow operations: at most one of
/// [`refresh_all`](DeviceBus::refresh_all) and
/// [`configure`](DeviceBus::configure) may be in flight at a time. The
/// session's suspend gate guarantees that; implementations do not need to
/// be reentrant. Speed writes and value reads are buffered register
/// accesses and are safe from any thread at any time.
pub trait DeviceBus: Send + Sync {
    /// Refresh every declared port in one pass. Never called concurrently
    /// with itself or `configure`.
    fn refresh_all(&self) -> Result<()>;

    /// Set a port's operating mode. Can take several seconds on real
    /// hardware. Never called concurrently with itself or `refresh_all`.
    fn configure(&self, port: Port, mode: ModeId) -> Result<()>;

    /// Buffered write of a motor's signed speed register, applied by the
    /// device at its next refresh
    fn set_speed(&self, port: MotorPort, value: i16);

    /// Latest refreshed raw value for a port
    fn raw_value(&self, port: Port) -> i32;
}
