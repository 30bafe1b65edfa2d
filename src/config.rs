//! Configuration management for VirtusDev
//!
//! Two sources are supported:
//!
//! - a persistent TOML file with device identity, timing and jiggler
//!   settings, stored in a platform-specific config directory;
//! - a `device.conf` file holding a `DEVICE=<profile>` line, as used by
//!   deployment scripts to pick the emulated device.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/virtusdev/config.toml` |
//! | macOS | `~/Library/Application Support/virtusdev/config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use virtusdev::Config;
//!
//! let mut config = Config::load().unwrap_or_default();
//! config.timing.baud_rate = 9600;
//! config.save().expect("Failed to save config");
//! ```

use crate::device::{
    DeviceIdentity, DeviceProfile, IdentityError, Jiggler, ProfileError, DEFAULT_PRODUCT_ID,
    DEFAULT_VENDOR_ID, DEFAULT_VERSION,
};
use crate::keyboard::{TimingProfile, DEFAULT_BAUD_RATE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Longest line accepted in `device.conf`
pub const MAX_CONF_LINE_LEN: usize = 256;

/// Longest value accepted for a `device.conf` key
pub const MAX_CONF_VALUE_LEN: usize = 64;

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A `device.conf` line exceeds the length limit
    #[error("line {line} is {len} bytes, limit is {max}")]
    LineTooLong { line: usize, len: usize, max: usize },
    /// A `device.conf` value exceeds the length limit
    #[error("value of {key} on line {line} is {len} bytes, limit is {max}")]
    ValueTooLong {
        key: String,
        line: usize,
        len: usize,
        max: usize,
    },
    /// Baud rate must be positive
    #[error("invalid baud rate {0}")]
    InvalidBaudRate(u32),
    /// Jiggle interval must be positive
    #[error("invalid jiggle interval {0} ms")]
    InvalidJiggleInterval(u64),
    /// Jiggle distance must be positive
    #[error("invalid jiggle distance {0}")]
    InvalidJiggleDistance(i32),
    /// Device name does not fit the kernel limits
    #[error("invalid device name: {0}")]
    InvalidName(#[from] IdentityError),
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("virtusdev");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Device selection and identity
    #[serde(default)]
    pub device: DeviceConfig,
    /// Keystroke pacing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Mouse jiggler settings
    #[serde(default)]
    pub jiggle: JiggleConfig,
    /// Writer settings
    #[serde(default)]
    pub writer: WriterConfig,
}

/// Device selection and identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Profile to emulate when none is given on the command line
    ///
    /// Kept as text so an unknown name does not invalidate the whole file.
    pub profile: Option<String>,
    /// Overrides the profile's default device name
    pub name: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            profile: None,
            name: None,
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            version: DEFAULT_VERSION,
        }
    }
}

/// Keystroke pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Serial line speed the scanner imitates, in bits per second
    pub baud_rate: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Mouse jiggler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JiggleConfig {
    /// Time between movements in milliseconds
    pub interval_ms: u64,
    /// Pointer travel per movement
    pub distance: i32,
}

impl Default for JiggleConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            distance: 1,
        }
    }
}

/// Writer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriterConfig {
    /// Name substring used to discover the target device
    pub device_name: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            device_name: DeviceProfile::Barcode.default_device_name().to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Timing derived from the configured baud rate
    pub fn timing_profile(&self) -> Result<TimingProfile, ConfigError> {
        TimingProfile::from_baud(self.timing.baud_rate)
            .ok_or(ConfigError::InvalidBaudRate(self.timing.baud_rate))
    }

    /// Identity for `profile`, using the configured name override if any
    pub fn identity_for(&self, profile: DeviceProfile) -> Result<DeviceIdentity, ConfigError> {
        let name = self
            .device
            .name
            .clone()
            .unwrap_or_else(|| profile.default_device_name().to_string());
        Ok(DeviceIdentity::new(
            name,
            self.device.vendor_id,
            self.device.product_id,
            self.device.version,
        )?)
    }

    /// The configured profile, if one is named
    pub fn profile(&self) -> Option<Result<DeviceProfile, ProfileError>> {
        self.device
            .profile
            .as_deref()
            .map(DeviceProfile::find_by_name)
    }

    /// Jiggler built from the `[jiggle]` section.
    ///
    /// The interval must be non-zero and the distance positive.
    pub fn jiggler(&self) -> Result<Jiggler, ConfigError> {
        if self.jiggle.interval_ms == 0 {
            return Err(ConfigError::InvalidJiggleInterval(self.jiggle.interval_ms));
        }
        if self.jiggle.distance <= 0 {
            return Err(ConfigError::InvalidJiggleDistance(self.jiggle.distance));
        }
        Ok(Jiggler::new(
            Duration::from_millis(self.jiggle.interval_ms),
            self.jiggle.distance,
        ))
    }
}

/// Find the first `key=value` entry in `device.conf` contents.
///
/// `#` comments and blank lines are skipped, and a value may be wrapped
/// in single or double quotes. Over-long lines and values are errors.
pub fn parse_conf_value(contents: &str, key: &str) -> Result<Option<String>, ConfigError> {
    for (index, raw) in contents.lines().enumerate() {
        let line_no = index + 1;
        if raw.len() > MAX_CONF_LINE_LEN {
            return Err(ConfigError::LineTooLong {
                line: line_no,
                len: raw.len(),
                max: MAX_CONF_LINE_LEN,
            });
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }

        let value = unquote(value.trim());
        if value.len() > MAX_CONF_VALUE_LEN {
            return Err(ConfigError::ValueTooLong {
                key: key.to_string(),
                line: line_no,
                len: value.len(),
                max: MAX_CONF_VALUE_LEN,
            });
        }
        return Ok(Some(value.to_string()));
    }
    Ok(None)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Read the `DEVICE` entry from a `device.conf` file.
///
/// Returns `Ok(None)` when the file has no such entry.
pub fn load_device_conf(path: &Path) -> Result<Option<String>, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_conf_value(&contents, "DEVICE")
}
