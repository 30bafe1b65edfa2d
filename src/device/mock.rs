//! In-memory injection handle that records every call
//!
//! Used by unit and integration tests in place of `/dev/uinput`.

use super::{DeviceIdentity, EventSink, InjectionHandle};
use crate::keyboard::EventType;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::time::SystemTime;

/// A written event as recorded by [`RecordingHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event_type: EventType,
    pub code: u16,
    pub value: i32,
    pub timestamp: SystemTime,
}

/// Recording test double for [`InjectionHandle`]
#[derive(Debug, Default)]
pub struct RecordingHandle {
    /// Declared event types
    pub event_types: BTreeSet<EventType>,
    /// Declared codes per event type
    pub codes: BTreeMap<EventType, BTreeSet<u16>>,
    /// Number of declaration calls made
    pub declare_calls: usize,
    /// Identity passed to `create_device`
    pub identity: Option<DeviceIdentity>,
    pub create_calls: usize,
    pub destroy_calls: usize,
    /// Every event written, in order
    pub events: Vec<RecordedEvent>,
    /// Fail declarations of this event type
    pub fail_declare: Option<EventType>,
    pub fail_create: bool,
    /// Fail the write with this index (0-based, counted across all writes)
    pub fail_write_at: Option<usize>,
    writes_attempted: usize,
}

impl RecordingHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes_for(&self, event_type: EventType) -> usize {
        self.codes.get(&event_type).map_or(0, |c| c.len())
    }

    pub fn has_code(&self, event_type: EventType, code: u16) -> bool {
        self.codes
            .get(&event_type)
            .is_some_and(|c| c.contains(&code))
    }

    /// Written events without their timestamps
    pub fn triples(&self) -> Vec<(EventType, u16, i32)> {
        self.events
            .iter()
            .map(|e| (e.event_type, e.code, e.value))
            .collect()
    }

    pub fn writes_attempted(&self) -> usize {
        self.writes_attempted
    }
}

impl EventSink for RecordingHandle {
    fn write_event(&mut self, event_type: EventType, code: u16, value: i32) -> io::Result<()> {
        let index = self.writes_attempted;
        self.writes_attempted += 1;
        if self.fail_write_at == Some(index) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.events.push(RecordedEvent {
            event_type,
            code,
            value,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }
}

impl InjectionHandle for RecordingHandle {
    fn declare_event_type(&mut self, event_type: EventType) -> io::Result<()> {
        self.declare_calls += 1;
        if self.fail_declare == Some(event_type) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.event_types.insert(event_type);
        Ok(())
    }

    fn declare_code(&mut self, event_type: EventType, code: u16) -> io::Result<()> {
        self.declare_calls += 1;
        if self.fail_declare == Some(event_type) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.codes.entry(event_type).or_default().insert(code);
        Ok(())
    }

    fn create_device(&mut self, identity: &DeviceIdentity) -> io::Result<()> {
        self.create_calls += 1;
        if self.fail_create {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.identity = Some(identity.clone());
        Ok(())
    }

    fn destroy_device(&mut self) -> io::Result<()> {
        self.destroy_calls += 1;
        Ok(())
    }
}
