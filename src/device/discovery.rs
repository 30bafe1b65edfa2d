//! Locate a registered input device and open its event node for writing
//!
//! Used by the writer to inject into a device created by another process.

use super::uinput::{open_write_only, write_raw_event};
use super::EventSink;
use crate::keyboard::EventType;
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for device discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No registered device name contains the pattern
    #[error("no input device matching '{0}' found")]
    NotFound(String),
    /// Permission denied opening the node
    #[error("permission denied accessing {0} (run with sudo or add user to the 'input' group)")]
    PermissionDenied(PathBuf),
    /// IO error opening the node
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiscoveryError {
    fn from_open(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            DiscoveryError::PermissionDenied(path.to_path_buf())
        } else {
            DiscoveryError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// A registered input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceEntry {
    pub name: String,
    pub path: PathBuf,
}

/// List registered input devices with their event nodes
pub fn list_input_devices() -> Vec<InputDeviceEntry> {
    evdev::enumerate()
        .map(|(path, device)| InputDeviceEntry {
            name: device.name().unwrap_or("").to_string(),
            path,
        })
        .collect()
}

/// Pick the device whose name contains `pattern`.
///
/// With several matches the highest-numbered event node wins, which is
/// the most recently registered device.
pub fn select_by_name<'a>(
    devices: &'a [InputDeviceEntry],
    pattern: &str,
) -> Option<&'a InputDeviceEntry> {
    devices
        .iter()
        .filter(|d| d.name.contains(pattern))
        .max_by_key(|d| event_index(&d.path))
}

fn event_index(path: &Path) -> u32 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("event"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Find the event node of the device whose name contains `pattern`
pub fn find_device_by_name(pattern: &str) -> Result<PathBuf, DiscoveryError> {
    let devices = list_input_devices();
    debug!("{} input device(s) registered", devices.len());
    select_by_name(&devices, pattern)
        .map(|d| d.path.clone())
        .ok_or_else(|| DiscoveryError::NotFound(pattern.to_string()))
}

/// An input event node opened as a write-only sink
pub struct EventNode {
    file: File,
    path: PathBuf,
}

impl EventNode {
    pub fn open(path: &Path) -> Result<Self, DiscoveryError> {
        let file = open_write_only(path).map_err(|e| DiscoveryError::from_open(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Discover the device by name and open it
    pub fn find(pattern: &str) -> Result<Self, DiscoveryError> {
        let path = find_device_by_name(pattern)?;
        info!("found device '{}' at {}", pattern, path.display());
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for EventNode {
    fn write_event(&mut self, event_type: EventType, code: u16, value: i32) -> io::Result<()> {
        write_raw_event(&mut self.file, event_type, code, value)
    }
}
