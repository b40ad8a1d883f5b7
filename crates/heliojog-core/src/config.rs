//! Jog configuration
//!
//! Settings are stored as JSON. Every field has a default, so a config file
//! only needs the values that differ from a stock controller on
//! `/dev/ttyACM0` at 115200 baud.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::profile::SpeedProfile;
use crate::protocol::{
    Channel, DEFAULT_BAUD_RATE, DEFAULT_INPUT_WAIT_MS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS,
};

/// Errors loading or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Config file I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid config JSON
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The values parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port name
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// How long to wait for a query response, in milliseconds
    pub response_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Which channel to drive and how
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Motor channel to jog
    pub channel: Channel,
    /// Speed step and bounds
    pub profile: SpeedProfile,
}

/// Complete jog configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JogConfig {
    /// Serial link
    pub connection: ConnectionSettings,

    /// What gets driven, and how hard
    pub drive: DriveSettings,

    /// How long to wait for a key before polling telemetry, in milliseconds
    pub input_wait_ms: u64,
}

impl Default for JogConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings::default(),
            drive: DriveSettings::default(),
            input_wait_ms: DEFAULT_INPUT_WAIT_MS,
        }
    }
}

impl JogConfig {
    /// Default config file location (`<config dir>/heliojog/config.json`)
    pub fn default_path() -> io::Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find home directory")
            })?;
        Ok(base.join("heliojog").join("config.json"))
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: JogConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given (it must exist), otherwise the default file if
    /// present, otherwise built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Ok(default) if default.exists() => {
                tracing::debug!(path = %default.display(), "loading config");
                Self::load(default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the jog session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive.profile.validate().map_err(ConfigError::Invalid)?;
        if self.connection.port.is_empty() {
            return Err(ConfigError::Invalid("serial port name is empty".into()));
        }
        if self.connection.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud rate must be non-zero".into()));
        }
        if self.connection.response_timeout_ms == 0 || self.input_wait_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    /// Query response wait as a [`Duration`]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.response_timeout_ms)
    }

    /// Key wait as a [`Duration`]
    pub fn input_wait(&self) -> Duration {
        Duration::from_millis(self.input_wait_ms)
    }
}
