//! Injection handle abstraction
//!
//! [`EventSink`] is the write side every emitter needs. [`InjectionHandle`]
//! adds the setup calls of an OS input-injection handle: capability bits,
//! identity submission and device creation/destruction.

use crate::keyboard::{EventType, InjectionEvent};
use std::io;
use thiserror::Error;

/// Longest device name the kernel accepts, excluding the terminating NUL
pub const MAX_DEVICE_NAME_LEN: usize = 79;

/// `BUS_USB` from `linux/input.h`
pub const BUS_USB: u16 = 0x03;

/// Something primitive input events can be written to
pub trait EventSink {
    /// Write a single event. The timestamp is assigned at write time.
    fn write_event(&mut self, event_type: EventType, code: u16, value: i32) -> io::Result<()>;

    fn emit(&mut self, event: InjectionEvent) -> io::Result<()> {
        self.write_event(event.event_type, event.code, event.value)
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn write_event(&mut self, event_type: EventType, code: u16, value: i32) -> io::Result<()> {
        (**self).write_event(event_type, code, value)
    }
}

/// OS-level handle for a virtual input device
pub trait InjectionHandle: EventSink {
    /// Declare that the device emits events of `event_type`
    fn declare_event_type(&mut self, event_type: EventType) -> io::Result<()>;

    /// Declare that the device emits `code` within `event_type`
    fn declare_code(&mut self, event_type: EventType, code: u16) -> io::Result<()>;

    /// Submit the identity and make the device visible to the OS
    fn create_device(&mut self, identity: &DeviceIdentity) -> io::Result<()>;

    /// Remove the device from the OS
    fn destroy_device(&mut self) -> io::Result<()>;
}

impl<H: InjectionHandle + ?Sized> InjectionHandle for &mut H {
    fn declare_event_type(&mut self, event_type: EventType) -> io::Result<()> {
        (**self).declare_event_type(event_type)
    }

    fn declare_code(&mut self, event_type: EventType, code: u16) -> io::Result<()> {
        (**self).declare_code(event_type, code)
    }

    fn create_device(&mut self, identity: &DeviceIdentity) -> io::Result<()> {
        (**self).create_device(identity)
    }

    fn destroy_device(&mut self) -> io::Result<()> {
        (**self).destroy_device()
    }
}

/// Errors building a device identity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("device name is empty")]
    EmptyName,
    #[error("device name is {len} bytes, limit is {max}")]
    NameTooLong { len: usize, max: usize },
    #[error("device name contains a NUL byte")]
    NulInName,
}

/// Identity submitted to the OS when the device is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub bus_type: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    name: String,
}

impl DeviceIdentity {
    /// Build a USB identity, rejecting names the kernel would truncate
    pub fn new(
        name: impl Into<String>,
        vendor_id: u16,
        product_id: u16,
        version: u16,
    ) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if name.len() > MAX_DEVICE_NAME_LEN {
            return Err(IdentityError::NameTooLong {
                len: name.len(),
                max: MAX_DEVICE_NAME_LEN,
            });
        }
        if name.contains('\0') {
            return Err(IdentityError::NulInName);
        }
        Ok(Self {
            bus_type: BUS_USB,
            vendor_id,
            product_id,
            version,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
