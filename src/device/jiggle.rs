//! Periodic pointer movement for the mouse jiggler profile

use super::EventSink;
use crate::cancel::CancelToken;
use crate::keyboard::{InjectionEvent, Pacer, REL_X};
use log::{debug, warn};
use std::time::Duration;

/// Longest single sleep, bounding how late a cancellation is noticed
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Moves the pointer right and back again on a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jiggler {
    pub interval: Duration,
    pub distance: i32,
}

impl Jiggler {
    pub fn new(interval: Duration, distance: i32) -> Self {
        Self { interval, distance }
    }

    /// Emit one out-and-back movement. Returns the number of failed writes.
    pub fn jiggle<S: EventSink + ?Sized>(&self, sink: &mut S) -> usize {
        let events = [
            InjectionEvent::relative(REL_X, self.distance),
            InjectionEvent::sync(),
            InjectionEvent::relative(REL_X, self.distance.saturating_neg()),
            InjectionEvent::sync(),
        ];
        let mut failures = 0;
        for event in events {
            if let Err(e) = sink.emit(event) {
                warn!("error writing jiggle event: {}", e);
                failures += 1;
            }
        }
        failures
    }

    /// Jiggle every interval until `cancel` is raised.
    /// Returns the number of movements made.
    pub fn run<S, P>(&self, sink: &mut S, pacer: &mut P, cancel: &CancelToken) -> u64
    where
        S: EventSink + ?Sized,
        P: Pacer,
    {
        let mut count = 0;
        while !cancel.is_cancelled() {
            if !sleep_sliced(self.interval, pacer, cancel) {
                break;
            }
            self.jiggle(sink);
            count += 1;
            debug!("jiggle #{}", count);
        }
        count
    }
}

/// Sleep for `total` in slices, returning false if cancelled first
fn sleep_sliced<P: Pacer>(total: Duration, pacer: &mut P, cancel: &CancelToken) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        pacer.pause(slice);
        remaining -= slice;
    }
    !cancel.is_cancelled()
}
