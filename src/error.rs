//! Error types for SetuIO

use crate::catalog::Family;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SetuIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Port number outside the declared range for its address space
    #[error("Invalid {kind} port: {port}")]
    InvalidPort {
        /// Address space the port was looked up in ("sensor" or "motor")
        kind: &'static str,
        /// The rejected port number
        port: u8,
    },

    /// Unrecognized device family tag
    #[error("Unknown device family: {0}")]
    UnknownFamily(String),

    /// Mode requested on a handle whose bound family does not support it
    #[error("{family} devices do not support {mode}")]
    UnsupportedMode {
        /// Family the handle is bound to
        family: Family,
        /// Human-readable name of the rejected request
        mode: &'static str,
    },

    /// Motor power outside the accepted range
    #[error("Invalid motor power: {0} (must be -255..=254)")]
    InvalidPower(i16),

    /// A read found no valid sample or a value outside the label table
    #[error("Unreadable sensor value: {0}")]
    Unreadable(&'static str),

    /// A bus refresh or configure call failed
    #[error("Bus error: {0}")]
    Bus(String),

    /// Timed out waiting on the suspend gate or a sensor condition
    #[error("Communication timeout")]
    Timeout,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}
