//! Event injection engine
//!
//! Turns a text payload into a paced stream of key events. Every
//! character goes through the same five steps:
//!
//! 1. shift down + SYN, wait press delay (shifted characters only)
//! 2. key down + SYN, wait press delay
//! 3. key up + SYN, wait release delay
//! 4. shift up + SYN, wait release delay (shifted characters only)
//! 5. wait the inter-key delay
//!
//! A line feed is sent after the payload, the way a scanner terminates a
//! scan. Characters without a scancode are skipped with a warning and
//! failed writes are logged; neither stops the transmission.

use super::keymap::{self, CharMapping, SHIFT_KEY};
use super::{EventType, KeyCode, KeyEventType, TimingProfile, SYN_REPORT};
use crate::cancel::CancelToken;
use crate::device::EventSink;
use log::{debug, info, warn};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

/// Character sent after every payload
pub const TERMINATOR: char = '\n';

/// Waits between emitted events
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

/// Blocking sleep on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested waits without sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pub pauses: Vec<Duration>,
}

impl RecordingPacer {
    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

/// Result of sending one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharOutcome {
    /// All steps ran; `write_errors` writes failed along the way
    Sent { modifier: bool, write_errors: usize },
    /// No scancode for the character, nothing was emitted
    Skipped,
}

/// Summary of one payload transmission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransmitReport {
    /// Characters in the payload, excluding the terminator
    pub payload_len: usize,
    /// Characters fully transmitted, including the terminator
    pub transmitted: usize,
    /// Characters skipped for lack of a scancode
    pub skipped: Vec<char>,
    /// Event writes that failed
    pub write_errors: usize,
    /// Wall-clock duration of the transmission
    pub elapsed_us: u64,
    /// Stopped early on a termination request
    pub cancelled: bool,
}

impl TransmitReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }

    /// Effective characters per second, if any time elapsed
    pub fn chars_per_sec(&self) -> Option<f64> {
        if self.elapsed_us == 0 {
            return None;
        }
        Some(self.transmitted as f64 * 1_000_000.0 / self.elapsed_us as f64)
    }
}

/// Writes paced key events for text payloads into a sink
pub struct Injector<S: EventSink, P: Pacer = ThreadSleep> {
    sink: S,
    timing: TimingProfile,
    pacer: P,
    cancel: Option<CancelToken>,
}

impl<S: EventSink> Injector<S, ThreadSleep> {
    pub fn new(sink: S, timing: TimingProfile) -> Self {
        Self::with_pacer(sink, timing, ThreadSleep)
    }
}

impl<S: EventSink, P: Pacer> Injector<S, P> {
    pub fn with_pacer(sink: S, timing: TimingProfile, pacer: P) -> Self {
        Self {
            sink,
            timing,
            pacer,
            cancel: None,
        }
    }

    /// Stop between characters once `token` is raised
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn into_parts(self) -> (S, P) {
        (self.sink, self.pacer)
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Send `payload` followed by the terminator
    pub fn transmit(&mut self, payload: &str) -> TransmitReport {
        let mut report = TransmitReport {
            payload_len: payload.chars().count(),
            ..TransmitReport::default()
        };
        info!(
            "sending {} character(s) at {} baud",
            report.payload_len, self.timing.baud_rate
        );

        let start = Instant::now();
        for c in payload.chars().chain(std::iter::once(TERMINATOR)) {
            if self.cancelled() {
                report.cancelled = true;
                break;
            }
            match self.send_char(c) {
                CharOutcome::Sent { write_errors, .. } => {
                    report.transmitted += 1;
                    report.write_errors += write_errors;
                }
                CharOutcome::Skipped => report.skipped.push(c),
            }
        }
        report.elapsed_us = start.elapsed().as_micros() as u64;

        if report.cancelled {
            warn!(
                "transmission cancelled after {} character(s)",
                report.transmitted
            );
        } else {
            info!(
                "transmission complete in {} μs ({:.2} ms), {:.0} chars/sec",
                report.elapsed_us,
                report.elapsed_us as f64 / 1000.0,
                report.chars_per_sec().unwrap_or(0.0)
            );
        }
        report
    }

    /// Run the five-step sequence for one character
    pub fn send_char(&mut self, c: char) -> CharOutcome {
        let Some(CharMapping {
            scancode,
            needs_modifier,
        }) = keymap::lookup(c)
        else {
            warn!("no keycode for character {:?} (0x{:02X})", c, c as u32);
            return CharOutcome::Skipped;
        };

        let mut write_errors = 0;
        let press = self.timing.press_delay();
        let release = self.timing.release_delay();

        if needs_modifier {
            write_errors += self.key_step(SHIFT_KEY, KeyEventType::Press, press);
        }
        write_errors += self.key_step(scancode, KeyEventType::Press, press);
        write_errors += self.key_step(scancode, KeyEventType::Release, release);
        if needs_modifier {
            write_errors += self.key_step(SHIFT_KEY, KeyEventType::Release, release);
        }
        self.pacer.pause(self.timing.inter_key_delay());

        debug!("sent {:?} as key {} (shift: {})", c, scancode, needs_modifier);
        CharOutcome::Sent {
            modifier: needs_modifier,
            write_errors,
        }
    }

    /// Key event, SYN report, then wait. Returns the number of failed writes.
    fn key_step(&mut self, key: KeyCode, state: KeyEventType, delay: Duration) -> usize {
        let mut failures = 0;
        if let Err(e) = self
            .sink
            .write_event(EventType::KEY, key.as_u16(), state.value())
        {
            warn!("error writing key {} {:?}: {}", key, state, e);
            failures += 1;
        }
        if let Err(e) = self
            .sink
            .write_event(EventType::SYNCHRONIZATION, SYN_REPORT, 0)
        {
            warn!("error writing sync event: {}", e);
            failures += 1;
        }
        self.pacer.pause(delay);
        failures
    }
}
