//! Input event types written to an injection sink

use super::KeyCode;
use std::fmt;
use std::time::SystemTime;

/// Linux input event type (`EV_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(pub u16);

impl EventType {
    pub const SYNCHRONIZATION: EventType = EventType(0x00);
    pub const KEY: EventType = EventType(0x01);
    pub const RELATIVE: EventType = EventType(0x02);
    pub const LED: EventType = EventType(0x11);

    pub fn name(&self) -> &'static str {
        match *self {
            EventType::SYNCHRONIZATION => "SYN",
            EventType::KEY => "KEY",
            EventType::RELATIVE => "REL",
            EventType::LED => "LED",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EV_{}", self.name())
    }
}

/// `SYN_REPORT` code for synchronization events
pub const SYN_REPORT: u16 = 0;

/// Relative axis codes
pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;

/// Key state values for `EV_KEY` events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key was pressed down
    Press,
    /// Key was released
    Release,
}

impl KeyEventType {
    pub fn value(self) -> i32 {
        match self {
            KeyEventType::Press => 1,
            KeyEventType::Release => 0,
        }
    }
}

/// A primitive event written to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionEvent {
    pub event_type: EventType,
    pub code: u16,
    pub value: i32,
    /// Stamped when the event is written, never ahead of time
    pub timestamp: SystemTime,
}

impl InjectionEvent {
    pub fn new(event_type: EventType, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
            timestamp: SystemTime::now(),
        }
    }

    pub fn key(key: KeyCode, state: KeyEventType) -> Self {
        Self::new(EventType::KEY, key.as_u16(), state.value())
    }

    pub fn sync() -> Self {
        Self::new(EventType::SYNCHRONIZATION, SYN_REPORT, 0)
    }

    pub fn relative(axis: u16, delta: i32) -> Self {
        Self::new(EventType::RELATIVE, axis, delta)
    }
}
