//! Symbol timing description
//!
//! A [`TimingSpec`] describes the pulse shape of a single-wire protocol:
//!
//! ```text
//!   T1H      T1L     T0H    T0L            TRST
//!  +-----+        +--+         ...  +--+
//!  |     |        |  |              |  |
//! -+     +--------+  +---------     +  +-------------------
//!   logical 1      logical 0              reset
//! ```
//!
//! All durations are in nanoseconds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pulse timing of one protocol, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingSpec {
    /// High time of a logical 1
    pub bit1_high_ns: u32,
    /// Low time of a logical 1
    pub bit1_low_ns: u32,
    /// High time of a logical 0
    pub bit0_high_ns: u32,
    /// Low time of a logical 0
    pub bit0_low_ns: u32,
    /// Minimum low time that latches / terminates a frame
    pub reset_ns: u32,
    /// Accepted deviation of `bit1_high_ns`
    pub bit1_high_tolerance_ns: u32,
    /// Accepted deviation of `bit1_low_ns`
    pub bit1_low_tolerance_ns: u32,
    /// Accepted deviation of `bit0_high_ns`
    pub bit0_high_tolerance_ns: u32,
    /// Accepted deviation of `bit0_low_ns`
    pub bit0_low_tolerance_ns: u32,
}

impl TimingSpec {
    /// Timing where every symbol half shares the same tolerance
    pub const fn uniform(
        bit1_high_ns: u32,
        bit1_low_ns: u32,
        bit0_high_ns: u32,
        bit0_low_ns: u32,
        tolerance_ns: u32,
        reset_ns: u32,
    ) -> Self {
        Self {
            bit1_high_ns,
            bit1_low_ns,
            bit0_high_ns,
            bit0_low_ns,
            reset_ns,
            bit1_high_tolerance_ns: tolerance_ns,
            bit1_low_tolerance_ns: tolerance_ns,
            bit0_high_tolerance_ns: tolerance_ns,
            bit0_low_tolerance_ns: tolerance_ns,
        }
    }

    /// Symbol durations in `[T1H, T1L, T0H, T0L]` order
    pub const fn durations(&self) -> [u32; 4] {
        [
            self.bit1_high_ns,
            self.bit1_low_ns,
            self.bit0_high_ns,
            self.bit0_low_ns,
        ]
    }

    /// Tolerances in the same order as [`durations`](Self::durations)
    pub const fn tolerances(&self) -> [u32; 4] {
        [
            self.bit1_high_tolerance_ns,
            self.bit1_low_tolerance_ns,
            self.bit0_high_tolerance_ns,
            self.bit0_low_tolerance_ns,
        ]
    }

    /// Longest symbol half
    pub fn max_duration_ns(&self) -> u32 {
        self.durations().into_iter().max().unwrap_or(0)
    }

    /// Integer mean of the four tolerances
    pub fn mean_tolerance_ns(&self) -> u32 {
        let sum: u64 = self.tolerances().iter().map(|&t| t as u64).sum();
        (sum / 4) as u32
    }

    /// Reset time truncated to whole microseconds, never less than 1
    pub fn reset_us(&self) -> u32 {
        (self.reset_ns / 1000).max(1)
    }
}

/// Integer division rounding half up
pub(crate) fn round_div(value: u32, divisor: u32) -> u32 {
    ((value as u64 + (divisor as u64 / 2)) / divisor as u64) as u32
}

/// Integer division rounding up
pub(crate) fn ceil_div(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor)
}

/// Distance between `value` and its nearest multiple of `step`
pub(crate) fn aligned_error(value: u32, step: u32) -> u32 {
    let nearest = round_div(value, step) as u64 * step as u64;
    (value as u64).abs_diff(nearest) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_truncates_to_microseconds() {
        let timing = TimingSpec::uniform(1250, 416, 625, 1041, 200, 3333);
        assert_eq!(timing.reset_us(), 3);

        let timing = TimingSpec::uniform(800, 450, 400, 850, 150, 50_000);
        assert_eq!(timing.reset_us(), 50);
    }

    #[test]
    fn test_short_reset_rounds_up_to_one_microsecond() {
        let timing = TimingSpec::uniform(1, 1, 1, 1, 1, 999);
        assert_eq!(timing.reset_us(), 1);

        let timing = TimingSpec::uniform(1, 1, 1, 1, 1, 0);
        assert_eq!(timing.reset_us(), 1);
    }

    #[test]
    fn test_mean_tolerance() {
        let mut timing = TimingSpec::uniform(1250, 416, 625, 1041, 200, 3333);
        assert_eq!(timing.mean_tolerance_ns(), 200);

        timing.bit0_low_tolerance_ns = 103;
        // (200 + 200 + 200 + 103) / 4 = 175.75
        assert_eq!(timing.mean_tolerance_ns(), 175);
    }

    #[test]
    fn test_max_duration() {
        let timing = TimingSpec::uniform(600, 600, 300, 900, 150, 80_000);
        assert_eq!(timing.max_duration_ns(), 900);
    }

    #[test]
    fn test_round_div_half_up() {
        assert_eq!(round_div(1250, 50), 25);
        assert_eq!(round_div(416, 50), 8); // 8.32
        assert_eq!(round_div(625, 50), 13); // 12.5 rounds up
        assert_eq!(round_div(1041, 50), 21); // 20.82
    }

    #[test]
    fn test_aligned_error() {
        assert_eq!(aligned_error(1250, 50), 0);
        assert_eq!(aligned_error(416, 50), 16);
        assert_eq!(aligned_error(625, 50), 25);
        assert_eq!(aligned_error(1041, 50), 9);
    }
}
