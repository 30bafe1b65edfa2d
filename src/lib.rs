//! VirtusDev - Virtual HID device emulator
//!
//! Creates virtual input devices through Linux uinput and types text into
//! them at the pace of a real serial barcode scanner. Four device profiles
//! are available: a barcode scanner, a USB keyboard, a mouse jiggler and an
//! RS232 serial scanner.

pub mod cancel;
pub mod config;
pub mod device;
pub mod input;
pub mod keyboard;

pub use cancel::CancelToken;
pub use config::{Config, ConfigError};
pub use device::{DeviceError, DeviceIdentity, DeviceProfile, VirtualDevice};
pub use keyboard::{Injector, TimingProfile, TransmitReport};
