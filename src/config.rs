//! Configuration for a SetuIO session
//!
//! Loads configuration from a TOML file with the few tunables the session
//! needs for pure hardware abstraction.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Session tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Poll loop cadence in milliseconds
    ///
    /// The hardware refreshes all ports in one pass; 200ms matches the
    /// observed refresh cadence of the brick firmware.
    pub poll_interval_ms: u64,

    /// Bound on the gate wait during handle cleanup, in milliseconds
    ///
    /// A dropped handle must return its port to a neutral state even when
    /// another critical section is congesting the gate; past this bound
    /// the cleanup is logged and abandoned rather than hanging the drop.
    pub close_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout, stderr, or file path)
    pub output: String,
}

impl SessionConfig {
    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            close_timeout_ms: 5000,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for the brick bus
    ///
    /// Suitable for testing and development. Deployments should use a
    /// proper TOML configuration file.
    pub fn brick_defaults() -> Self {
        Self {
            session: SessionConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::brick_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::brick_defaults();
        assert_eq!(config.session.poll_interval_ms, 200);
        assert_eq!(config.session.close_timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.output, "stdout");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::brick_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        // Should contain all sections
        assert!(toml_string.contains("[session]"));
        assert!(toml_string.contains("[logging]"));

        // Should contain key values
        assert!(toml_string.contains("poll_interval_ms = 200"));
        assert!(toml_string.contains("level = \"info\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[session]
poll_interval_ms = 100
close_timeout_ms = 2500

[logging]
level = "debug"
output = "stderr"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.session.poll_interval_ms, 100);
        assert_eq!(config.session.close_timeout(), Duration::from_millis(2500));
        assert_eq!(config.logging.level, "debug");
    }
}
