//! Virtual device profiles, OS handles and lifecycle

#[cfg(target_os = "linux")]
pub mod discovery;
mod handle;
pub mod jiggle;
mod lifecycle;
pub mod mock;
mod profile;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use handle::{
    DeviceIdentity, EventSink, IdentityError, InjectionHandle, BUS_USB, MAX_DEVICE_NAME_LEN,
};
pub use jiggle::Jiggler;
pub use lifecycle::{DeviceState, VirtualDevice};
pub use profile::{CodeSet, DeviceInfo, DeviceProfile, ProfileError, KEY_CODE_COUNT};

use crate::keyboard::EventType;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pause after creation so the OS can register the device node
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Vendor id used when none is configured
pub const DEFAULT_VENDOR_ID: u16 = 0x1234;
/// Product id used when none is configured
pub const DEFAULT_PRODUCT_ID: u16 = 0x5678;
/// Device version used when none is configured
pub const DEFAULT_VERSION: u16 = 0x0001;

/// Fatal device setup errors
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "failed to declare {event_type} capability{}: {source}",
        .code.map(|c| format!(" for code {}", c)).unwrap_or_default()
    )]
    Capability {
        event_type: EventType,
        code: Option<u16>,
        #[source]
        source: io::Error,
    },
    #[error("device creation failed: {0}")]
    Create(#[source] io::Error),
    #[error("device is {state:?}, expected {expected:?}")]
    InvalidState {
        state: DeviceState,
        expected: DeviceState,
    },
}

impl DeviceError {
    /// Suggested fix for the user, if there is one
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            DeviceError::Open { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => Some("Try: sudo modprobe uinput"),
                io::ErrorKind::PermissionDenied => Some(
                    "Run with sudo, or add a udev rule granting your user write access to /dev/uinput",
                ),
                _ => Some("Check that the uinput module is loaded: lsmod | grep uinput"),
            },
            DeviceError::Create(_) => Some("Check the kernel log (dmesg) for uinput errors"),
            _ => None,
        }
    }
}
