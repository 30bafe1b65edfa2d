//! Virtual device lifecycle
//!
//! A [`VirtualDevice`] owns its injection handle and moves it through
//! `Uninitialized -> Configured -> Created -> Destroyed`. Teardown runs on
//! every exit path, either explicitly or from `Drop`, and only once.

use super::{DeviceError, DeviceIdentity, DeviceProfile, InjectionHandle};
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};

/// Lifecycle state of a virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Configured,
    Created,
    Destroyed,
}

/// A virtual input device and the handle backing it
pub struct VirtualDevice<H: InjectionHandle> {
    profile: DeviceProfile,
    identity: DeviceIdentity,
    handle: Option<H>,
    state: DeviceState,
}

impl<H: InjectionHandle> VirtualDevice<H> {
    pub fn new(profile: DeviceProfile, identity: DeviceIdentity) -> Self {
        Self {
            profile,
            identity,
            handle: None,
            state: DeviceState::Uninitialized,
        }
    }

    /// Open, configure and create a device in one step
    pub fn bring_up<F>(
        profile: DeviceProfile,
        identity: DeviceIdentity,
        path: &Path,
        open: F,
    ) -> Result<Self, DeviceError>
    where
        F: FnOnce() -> io::Result<H>,
    {
        let mut device = Self::new(profile, identity);
        device.configure(path, open)?;
        device.create()?;
        Ok(device)
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Open the handle and declare the profile's capabilities.
    ///
    /// On a declaration failure the handle is released before returning.
    pub fn configure<F>(&mut self, path: &Path, open: F) -> Result<(), DeviceError>
    where
        F: FnOnce() -> io::Result<H>,
    {
        self.expect_state(DeviceState::Uninitialized)?;

        let mut handle = open().map_err(|source| DeviceError::Open {
            path: PathBuf::from(path),
            source,
        })?;
        // `handle` is dropped, and so closed, if this fails
        self.profile.declare_capabilities(&mut handle)?;

        self.handle = Some(handle);
        self.state = DeviceState::Configured;
        debug!("device '{}' configured", self.identity.name());
        Ok(())
    }

    /// Submit the identity and make the device visible to the OS.
    ///
    /// On failure the handle is closed and the device is `Destroyed`.
    pub fn create(&mut self) -> Result<(), DeviceError> {
        self.expect_state(DeviceState::Configured)?;
        let Some(handle) = self.handle.as_mut() else {
            return Err(DeviceError::InvalidState {
                state: self.state,
                expected: DeviceState::Configured,
            });
        };

        if let Err(source) = handle.create_device(&self.identity) {
            self.handle = None;
            self.state = DeviceState::Destroyed;
            return Err(DeviceError::Create(source));
        }

        self.state = DeviceState::Created;
        info!(
            "created {} device '{}' ({:04x}:{:04x})",
            self.profile,
            self.identity.name(),
            self.identity.vendor_id,
            self.identity.product_id
        );
        Ok(())
    }

    /// Borrow the handle as a write sink. Only available once created.
    pub fn sink(&mut self) -> Option<&mut H> {
        match self.state {
            DeviceState::Created => self.handle.as_mut(),
            _ => None,
        }
    }

    /// Run the profile cleanup, destroy the OS device and release the
    /// handle. Later calls are no-ops.
    pub fn teardown(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            self.state = DeviceState::Destroyed;
            return;
        };

        if self.state == DeviceState::Created {
            self.profile.cleanup(&mut handle);
            if let Err(e) = handle.destroy_device() {
                warn!("failed to destroy device '{}': {}", self.identity.name(), e);
            } else {
                info!("device '{}' destroyed", self.identity.name());
            }
        }

        drop(handle);
        self.state = DeviceState::Destroyed;
    }

    fn expect_state(&self, expected: DeviceState) -> Result<(), DeviceError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DeviceError::InvalidState {
                state: self.state,
                expected,
            })
        }
    }
}

impl<H: InjectionHandle> Drop for VirtualDevice<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
