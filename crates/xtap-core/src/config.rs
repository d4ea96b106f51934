// Xtap Engine Configuration
// Immutable startup configuration shared by the engine and the binary

use std::time::Duration;

/// Tap timeout applied when none is configured
pub const DEFAULT_TAP_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors in startup configuration values
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timeout '{0}': expected a positive number of milliseconds")]
    InvalidTimeout(String),
}

/// Engine configuration, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum press-to-release time for a tap to fire
    pub tap_timeout: Duration,
    /// Verbose per-event tracing
    pub debug: bool,
    /// Stay attached to the terminal instead of daemonizing
    pub foreground: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tap_timeout: DEFAULT_TAP_TIMEOUT,
            debug: false,
            foreground: false,
        }
    }
}

impl EngineConfig {
    /// Parse a tap timeout given as a count of milliseconds on the command
    /// line. Non-positive and non-numeric values are configuration errors.
    pub fn timeout_from_millis_arg(text: &str) -> Result<Duration, ConfigError> {
        match text.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
            _ => Err(ConfigError::InvalidTimeout(text.to_string())),
        }
    }
}
