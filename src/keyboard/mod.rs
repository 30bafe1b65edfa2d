//! Character encoding, timing and paced key event injection

mod event;
pub mod injector;
pub mod keymap;
mod timing;

pub use event::{EventType, InjectionEvent, KeyEventType, REL_X, REL_Y, SYN_REPORT};
pub use injector::{
    CharOutcome, Injector, Pacer, RecordingPacer, ThreadSleep, TransmitReport, TERMINATOR,
};
pub use keymap::{lookup, needs_modifier, scancode_for, CharMapping, KeyCode, Lookup};
pub use timing::{char_time_us, TimingProfile, BITS_PER_CHAR, DEFAULT_BAUD_RATE};
