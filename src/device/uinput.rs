//! Linux `uinput` injection handle
//!
//! Talks to `/dev/uinput` directly through its ioctl interface: capability
//! bits with `UI_SET_*BIT`, identity with `UI_DEV_SETUP`, then
//! `UI_DEV_CREATE`/`UI_DEV_DESTROY`. Events are written as raw
//! `struct input_event` records.

use super::{DeviceIdentity, EventSink, InjectionHandle};
use crate::keyboard::EventType;
use nix::libc;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default uinput control node
pub const UINPUT_PATH: &str = "/dev/uinput";

/// `UINPUT_MAX_NAME_SIZE` from `linux/uinput.h`
const UINPUT_MAX_NAME_SIZE: usize = 80;

const UINPUT_IOCTL_BASE: u8 = b'U';

/// A raw input event as the kernel reads it
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct RawInputEvent {
    tv_sec: libc::time_t,
    tv_usec: libc::suseconds_t,
    event_type: u16,
    code: u16,
    value: i32,
}

const INPUT_EVENT_SIZE: usize = std::mem::size_of::<RawInputEvent>();

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

nix::ioctl_none!(ui_dev_create, UINPUT_IOCTL_BASE, 1);
nix::ioctl_none!(ui_dev_destroy, UINPUT_IOCTL_BASE, 2);
nix::ioctl_write_ptr!(ui_dev_setup, UINPUT_IOCTL_BASE, 3, UinputSetup);
nix::ioctl_write_int!(ui_set_evbit, UINPUT_IOCTL_BASE, 100);
nix::ioctl_write_int!(ui_set_keybit, UINPUT_IOCTL_BASE, 101);
nix::ioctl_write_int!(ui_set_relbit, UINPUT_IOCTL_BASE, 102);
nix::ioctl_write_int!(ui_set_ledbit, UINPUT_IOCTL_BASE, 105);

/// Encode an event with the current wall-clock time
fn encode_event(event_type: EventType, code: u16, value: i32) -> [u8; INPUT_EVENT_SIZE] {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let event = RawInputEvent {
        tv_sec: now.as_secs() as libc::time_t,
        tv_usec: now.subsec_micros() as libc::suseconds_t,
        event_type: event_type.0,
        code,
        value,
    };
    // SAFETY: RawInputEvent is repr(C), Copy and has no padding on Linux targets
    unsafe { std::mem::transmute::<RawInputEvent, [u8; INPUT_EVENT_SIZE]>(event) }
}

/// Write one encoded event to an open input node
pub(crate) fn write_raw_event(
    file: &mut File,
    event_type: EventType,
    code: u16,
    value: i32,
) -> io::Result<()> {
    file.write_all(&encode_event(event_type, code, value))
}

/// Open a device node write-only and non-blocking
pub(crate) fn open_write_only(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Handle on `/dev/uinput`
pub struct UinputHandle {
    file: File,
}

impl UinputHandle {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_write_only(path)?,
        })
    }

    fn fd(&self) -> libc::c_int {
        self.file.as_raw_fd()
    }
}

impl EventSink for UinputHandle {
    fn write_event(&mut self, event_type: EventType, code: u16, value: i32) -> io::Result<()> {
        write_raw_event(&mut self.file, event_type, code, value)
    }
}

impl InjectionHandle for UinputHandle {
    fn declare_event_type(&mut self, event_type: EventType) -> io::Result<()> {
        // SAFETY: fd is an open uinput node owned by self
        unsafe { ui_set_evbit(self.fd(), event_type.0 as _) }?;
        Ok(())
    }

    fn declare_code(&mut self, event_type: EventType, code: u16) -> io::Result<()> {
        let fd = self.fd();
        // SAFETY: fd is an open uinput node owned by self
        unsafe {
            match event_type {
                EventType::KEY => ui_set_keybit(fd, code as _),
                EventType::RELATIVE => ui_set_relbit(fd, code as _),
                EventType::LED => ui_set_ledbit(fd, code as _),
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("no code bits for {}", other),
                    ))
                }
            }
        }?;
        Ok(())
    }

    fn create_device(&mut self, identity: &DeviceIdentity) -> io::Result<()> {
        let mut name = [0u8; UINPUT_MAX_NAME_SIZE];
        let bytes = identity.name().as_bytes();
        // DeviceIdentity bounds the name below UINPUT_MAX_NAME_SIZE
        if bytes.len() >= UINPUT_MAX_NAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "device name too long"));
        }
        name[..bytes.len()].copy_from_slice(bytes);

        let setup = UinputSetup {
            id: InputId {
                bustype: identity.bus_type,
                vendor: identity.vendor_id,
                product: identity.product_id,
                version: identity.version,
            },
            name,
            ff_effects_max: 0,
        };

        // SAFETY: fd is an open uinput node and setup outlives the call
        unsafe {
            ui_dev_setup(self.fd(), &setup)?;
            ui_dev_create(self.fd())?;
        }
        Ok(())
    }

    fn destroy_device(&mut self) -> io::Result<()> {
        // SAFETY: fd is an open uinput node owned by self
        unsafe { ui_dev_destroy(self.fd()) }?;
        Ok(())
    }
}
