//! Serial line timing derived from a baud rate
//!
//! A scanner on a serial line sends one start bit, eight data bits and
//! one stop bit per character, so a character occupies ten bit times.
//! Key press and release each hold for one character time and the gap
//! between characters is two character times.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

/// Bits on the wire per transmitted character (start + 8 data + stop)
pub const BITS_PER_CHAR: u64 = 10;

/// Baud rate of the emulated scanner when nothing else is configured
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Delays applied by the injection engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingProfile {
    pub baud_rate: u32,
    pub bit_time_us: f64,
    pub char_time_us: u64,
    pub press_delay_us: u64,
    pub release_delay_us: u64,
    pub inter_key_delay_us: u64,
}

impl TimingProfile {
    /// Derive all delays from `baud_rate`.
    ///
    /// Returns `None` for a zero baud rate.
    pub fn from_baud(baud_rate: u32) -> Option<Self> {
        NonZeroU32::new(baud_rate).map(Self::for_rate)
    }

    pub fn for_rate(baud_rate: NonZeroU32) -> Self {
        let char_time_us = char_time_us(baud_rate.get());
        Self {
            baud_rate: baud_rate.get(),
            bit_time_us: 1_000_000.0 / baud_rate.get() as f64,
            char_time_us,
            press_delay_us: char_time_us,
            release_delay_us: char_time_us,
            inter_key_delay_us: char_time_us * 2,
        }
    }

    pub fn press_delay(&self) -> Duration {
        Duration::from_micros(self.press_delay_us)
    }

    pub fn release_delay(&self) -> Duration {
        Duration::from_micros(self.release_delay_us)
    }

    pub fn inter_key_delay(&self) -> Duration {
        Duration::from_micros(self.inter_key_delay_us)
    }
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::for_rate(NonZeroU32::MIN.saturating_add(DEFAULT_BAUD_RATE - 1))
    }
}

/// Time to transmit one character at `baud_rate`, rounded to the
/// nearest microsecond. `baud_rate` must be non-zero.
pub fn char_time_us(baud_rate: u32) -> u64 {
    let baud = baud_rate.max(1) as u64;
    (BITS_PER_CHAR * 1_000_000 + baud / 2) / baud
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_time_rounds_to_nearest_microsecond() {
        for baud in [1u32, 3, 7, 110, 300, 1200, 2400, 9600, 19200, 57600, 115_200, 921_600] {
            let expected = (10_000_000f64 / baud as f64).round() as u64;
            assert_eq!(char_time_us(baud), expected, "baud {}", baud);
        }
    }

    #[test]
    fn known_rates() {
        assert_eq!(char_time_us(9600), 1042);
        assert_eq!(char_time_us(115_200), 87);
        assert_eq!(char_time_us(300), 33_333);
    }

    #[test]
    fn zero_baud_is_rejected() {
        assert!(TimingProfile::from_baud(0).is_none());
    }

    #[test]
    fn delays_derive_from_char_time() {
        let timing = TimingProfile::from_baud(9600).unwrap();
        assert_eq!(timing.press_delay_us, 1042);
        assert_eq!(timing.release_delay_us, 1042);
        assert_eq!(timing.inter_key_delay_us, 2084);
        assert!((timing.bit_time_us - 104.1666).abs() < 0.001);
    }

    #[test]
    fn changing_baud_scales_every_delay() {
        let slow = TimingProfile::from_baud(1200).unwrap();
        let fast = TimingProfile::from_baud(2400).unwrap();
        assert!(slow.press_delay_us > fast.press_delay_us);
        assert!(slow.release_delay_us > fast.release_delay_us);
        assert!(slow.inter_key_delay_us > fast.inter_key_delay_us);
        assert_eq!(slow.char_time_us, 8333);
        assert_eq!(fast.char_time_us, 4167);
    }

    #[test]
    fn default_is_115200() {
        let timing = TimingProfile::default();
        assert_eq!(timing.baud_rate, 115_200);
        assert_eq!(timing.char_time_us, 87);
    }
}
