//! Device profile registry
//!
//! The set of emulated devices is closed: a barcode scanner, a full USB
//! keyboard, a mouse jiggler and an RS232 serial scanner. Each profile
//! knows which capabilities to declare, how to clean up, and how to
//! describe itself once created.

use super::{DeviceError, DeviceIdentity, InjectionHandle};
use crate::keyboard::{EventType, KeyCode, TimingProfile, REL_X, REL_Y};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of key codes declared by keyboard-style profiles
pub const KEY_CODE_COUNT: u16 = 256;

/// Error returned when a profile name is not registered
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown device profile '{0}' (expected one of: barcode, usb_keyboard, mouse_jiggle, rs232)")]
pub struct ProfileError(pub String);

/// A virtual device kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    Barcode,
    UsbKeyboard,
    MouseJiggle,
    Rs232,
}

/// Codes a profile declares for one event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSet {
    /// No codes, the type bit alone
    None,
    /// Every key code below [`KEY_CODE_COUNT`]
    AllKeys,
    /// An explicit list
    List(&'static [u16]),
}

impl CodeSet {
    pub fn codes(&self) -> Vec<u16> {
        match self {
            CodeSet::None => Vec::new(),
            CodeSet::AllKeys => (0..KEY_CODE_COUNT).collect(),
            CodeSet::List(codes) => codes.to_vec(),
        }
    }
}

const MOUSE_BUTTONS: &[u16] = &[
    KeyCode::BTN_LEFT.0,
    KeyCode::BTN_RIGHT.0,
    KeyCode::BTN_MIDDLE.0,
];

const MOUSE_AXES: &[u16] = &[REL_X, REL_Y];

const KEYBOARD_CAPS: &[(EventType, CodeSet)] = &[
    (EventType::KEY, CodeSet::AllKeys),
    (EventType::SYNCHRONIZATION, CodeSet::None),
];

const USB_KEYBOARD_CAPS: &[(EventType, CodeSet)] = &[
    (EventType::KEY, CodeSet::AllKeys),
    (EventType::LED, CodeSet::None),
    (EventType::SYNCHRONIZATION, CodeSet::None),
];

// No SYN type bit here, matching the hardware this profile was modelled on.
// The kernel sets EV_SYN on every registered device regardless.
const MOUSE_JIGGLE_CAPS: &[(EventType, CodeSet)] = &[
    (EventType::KEY, CodeSet::List(MOUSE_BUTTONS)),
    (EventType::RELATIVE, CodeSet::List(MOUSE_AXES)),
];

impl DeviceProfile {
    /// All profiles in registry order
    pub const ALL: [DeviceProfile; 4] = [
        DeviceProfile::Barcode,
        DeviceProfile::UsbKeyboard,
        DeviceProfile::MouseJiggle,
        DeviceProfile::Rs232,
    ];

    pub fn list() -> &'static [DeviceProfile] {
        &Self::ALL
    }

    pub fn find_by_name(name: &str) -> Result<Self, ProfileError> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| ProfileError(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceProfile::Barcode => "barcode",
            DeviceProfile::UsbKeyboard => "usb_keyboard",
            DeviceProfile::MouseJiggle => "mouse_jiggle",
            DeviceProfile::Rs232 => "rs232",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeviceProfile::Barcode => {
                "Barcode Scanner (115200 baud) - Emulates USB HID barcode reader"
            }
            DeviceProfile::UsbKeyboard => "USB Keyboard - Full featured virtual USB HID keyboard",
            DeviceProfile::MouseJiggle => {
                "Mouse Jiggler - Prevents screen lock by moving mouse periodically"
            }
            DeviceProfile::Rs232 => {
                "RS232 Serial Port - Virtual serial port communication interface"
            }
        }
    }

    /// Name the device registers under unless overridden
    pub fn default_device_name(&self) -> &'static str {
        match self {
            DeviceProfile::Barcode => "Virtual Keyboard 115200",
            DeviceProfile::UsbKeyboard => "Virtual USB Keyboard",
            DeviceProfile::MouseJiggle => "Virtual Mouse Jiggler",
            DeviceProfile::Rs232 => "Virtual RS232 Serial Port",
        }
    }

    fn device_type(&self) -> &'static str {
        match self {
            DeviceProfile::Barcode => "Barcode Scanner (HID Keyboard)",
            DeviceProfile::UsbKeyboard => "USB HID Keyboard",
            DeviceProfile::MouseJiggle => "USB HID Mouse (Auto-jiggle)",
            DeviceProfile::Rs232 => "RS232 Serial Port Emulator",
        }
    }

    /// Whether the profile paces keystrokes like a serial line
    pub fn uses_serial_timing(&self) -> bool {
        matches!(self, DeviceProfile::Barcode | DeviceProfile::Rs232)
    }

    /// Whether the profile accepts text payloads
    pub fn accepts_payloads(&self) -> bool {
        !matches!(self, DeviceProfile::MouseJiggle)
    }

    /// Event types and codes declared for this profile, in declaration order
    pub fn capabilities(&self) -> &'static [(EventType, CodeSet)] {
        match self {
            DeviceProfile::Barcode | DeviceProfile::Rs232 => KEYBOARD_CAPS,
            DeviceProfile::UsbKeyboard => USB_KEYBOARD_CAPS,
            DeviceProfile::MouseJiggle => MOUSE_JIGGLE_CAPS,
        }
    }

    /// Assert this profile's capability bits on `handle`.
    ///
    /// Writes no events. Safe to repeat before the device is created.
    /// The first failing call aborts the declaration.
    pub fn declare_capabilities<H: InjectionHandle + ?Sized>(
        &self,
        handle: &mut H,
    ) -> Result<(), DeviceError> {
        for (event_type, codes) in self.capabilities() {
            handle
                .declare_event_type(*event_type)
                .map_err(|source| DeviceError::Capability {
                    event_type: *event_type,
                    code: None,
                    source,
                })?;
            for code in codes.codes() {
                handle
                    .declare_code(*event_type, code)
                    .map_err(|source| DeviceError::Capability {
                        event_type: *event_type,
                        code: Some(code),
                        source,
                    })?;
            }
        }
        debug!("declared capabilities for profile {}", self.name());
        Ok(())
    }

    /// Profile-specific teardown, run before the device is destroyed
    pub fn cleanup<H: InjectionHandle + ?Sized>(&self, _handle: &mut H) {
        debug!("cleanup for profile {}", self.name());
    }

    /// Describe the created device
    pub fn describe(&self, identity: &DeviceIdentity, timing: &TimingProfile) -> DeviceInfo {
        let mut rows = vec![
            ("Device Name", identity.name().to_string()),
            ("Device Type", self.device_type().to_string()),
        ];
        if self.uses_serial_timing() {
            rows.push(("Baudrate", format!("{} bps", timing.baud_rate)));
            rows.push(("Bit Time", format!("{:.2} μs", timing.bit_time_us)));
            rows.push(("Char Time", format!("{} μs", timing.char_time_us)));
        }
        rows.push(("Vendor ID", format!("0x{:04X}", identity.vendor_id)));
        rows.push(("Product ID", format!("0x{:04X}", identity.product_id)));
        rows.push((
            "Created",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ));

        let status = match self {
            DeviceProfile::Barcode => "Device is ready and waiting for barcode scans...",
            DeviceProfile::MouseJiggle => "Device is ready (jiggling to prevent sleep)...",
            DeviceProfile::UsbKeyboard | DeviceProfile::Rs232 => "Device is ready...",
        };

        DeviceInfo {
            title: self.banner_title(),
            rows,
            locate_hint: format!(
                "cat /proc/bus/input/devices | grep -A 5 '{}'",
                identity.name()
            ),
            status,
        }
    }

    fn banner_title(&self) -> &'static str {
        match self {
            DeviceProfile::Barcode => "VIRTUAL BARCODE READER DEVICE CREATED",
            DeviceProfile::UsbKeyboard => "VIRTUAL USB KEYBOARD DEVICE CREATED",
            DeviceProfile::MouseJiggle => "VIRTUAL MOUSE JIGGLER DEVICE CREATED",
            DeviceProfile::Rs232 => "VIRTUAL RS232 SERIAL PORT DEVICE CREATED",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::find_by_name(s.trim())
    }
}

/// Description of a created device, shown once at startup
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
    /// Shell command that shows the registered device
    pub locate_hint: String,
    pub status: &'static str,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (label, value) in &self.rows {
            writeln!(f, "  {:<12} : {}", label, value)?;
        }
        writeln!(f, "Check device location with:")?;
        writeln!(f, "  {}", self.locate_hint)?;
        write!(f, "{}", self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::RecordingHandle;

    #[test]
    fn list_is_fixed_order() {
        let names: Vec<&str> = DeviceProfile::list().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["barcode", "usb_keyboard", "mouse_jiggle", "rs232"]);
    }

    #[test]
    fn find_by_name_round_trips_every_profile() {
        for profile in DeviceProfile::list() {
            assert_eq!(DeviceProfile::find_by_name(profile.name()), Ok(*profile));
        }
    }

    #[test]
    fn find_by_name_unknown() {
        let err = DeviceProfile::find_by_name("joystick").unwrap_err();
        assert_eq!(err, ProfileError("joystick".to_string()));
        assert!(err.to_string().contains("joystick"));
    }

    #[test]
    fn from_str_trims() {
        assert_eq!(" rs232 ".parse::<DeviceProfile>(), Ok(DeviceProfile::Rs232));
    }

    #[test]
    fn barcode_declares_keys_and_syn() {
        let mut handle = RecordingHandle::new();
        DeviceProfile::Barcode.declare_capabilities(&mut handle).unwrap();

        assert_eq!(
            handle.event_types.iter().copied().collect::<Vec<_>>(),
            vec![EventType::SYNCHRONIZATION, EventType::KEY]
        );
        assert_eq!(handle.codes_for(EventType::KEY), 256);
        assert!(handle.has_code(EventType::KEY, 0));
        assert!(handle.has_code(EventType::KEY, 255));
        assert!(handle.events.is_empty());
    }

    #[test]
    fn usb_keyboard_adds_led() {
        let mut handle = RecordingHandle::new();
        DeviceProfile::UsbKeyboard.declare_capabilities(&mut handle).unwrap();

        assert!(handle.event_types.contains(&EventType::LED));
        assert!(handle.event_types.contains(&EventType::KEY));
        assert!(handle.event_types.contains(&EventType::SYNCHRONIZATION));
        assert_eq!(handle.codes_for(EventType::KEY), 256);
        assert_eq!(handle.codes_for(EventType::LED), 0);
    }

    #[test]
    fn mouse_jiggle_declares_buttons_and_axes_without_syn() {
        let mut handle = RecordingHandle::new();
        DeviceProfile::MouseJiggle.declare_capabilities(&mut handle).unwrap();

        assert_eq!(
            handle.event_types.iter().copied().collect::<Vec<_>>(),
            vec![EventType::KEY, EventType::RELATIVE]
        );
        assert_eq!(handle.codes_for(EventType::KEY), 3);
        assert!(handle.has_code(EventType::KEY, 0x110));
        assert!(handle.has_code(EventType::KEY, 0x111));
        assert!(handle.has_code(EventType::KEY, 0x112));
        assert!(handle.has_code(EventType::RELATIVE, REL_X));
        assert!(handle.has_code(EventType::RELATIVE, REL_Y));
    }

    #[test]
    fn rs232_matches_barcode_capabilities() {
        assert_eq!(
            DeviceProfile::Rs232.capabilities(),
            DeviceProfile::Barcode.capabilities()
        );
    }

    #[test]
    fn declaration_is_idempotent() {
        let mut handle = RecordingHandle::new();
        DeviceProfile::UsbKeyboard.declare_capabilities(&mut handle).unwrap();
        let types = handle.event_types.clone();
        let codes = handle.codes.clone();

        DeviceProfile::UsbKeyboard.declare_capabilities(&mut handle).unwrap();
        assert_eq!(handle.event_types, types);
        assert_eq!(handle.codes, codes);
    }

    #[test]
    fn declaration_failure_is_reported() {
        let mut handle = RecordingHandle::new();
        handle.fail_declare = Some(EventType::KEY);

        let err = DeviceProfile::Barcode
            .declare_capabilities(&mut handle)
            .unwrap_err();
        match err {
            DeviceError::Capability { event_type, code, .. } => {
                assert_eq!(event_type, EventType::KEY);
                assert_eq!(code, None);
            }
            other => panic!("unexpected error {:?}", other),
        }
        // Aborted on the first failure
        assert_eq!(handle.declare_calls, 1);
    }

    #[test]
    fn describe_includes_timing_for_scanners_only() {
        let identity = DeviceIdentity::new("Scanner", 0x1234, 0x5678, 1).unwrap();
        let timing = TimingProfile::from_baud(9600).unwrap();

        let info = DeviceProfile::Barcode.describe(&identity, &timing);
        assert!(info.rows.iter().any(|(label, v)| *label == "Baudrate" && v == "9600 bps"));
        assert!(info.locate_hint.contains("'Scanner'"));

        let info = DeviceProfile::UsbKeyboard.describe(&identity, &timing);
        assert!(info.rows.iter().all(|(label, _)| *label != "Baudrate"));
        assert!(info.to_string().contains("0x5678"));
    }

    #[test]
    fn profile_serializes_snake_case() {
        let json = serde_json::to_string(&DeviceProfile::MouseJiggle).unwrap();
        assert_eq!(json, "\"mouse_jiggle\"");
    }
}
