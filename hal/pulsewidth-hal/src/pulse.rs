//! Pulse-train peripheral abstractions
//!
//! A pulse-train peripheral plays back a sequence of [`PulseCode`]
//! descriptors, each describing two consecutive output levels and how many
//! peripheral clock ticks each level is held for.

/// Widest tick count a single descriptor half can hold (15-bit field)
pub const MAX_PULSE_TICKS: u16 = 0x7FFF;

/// One pulse descriptor: `level0` for `duration0` ticks, then `level1` for
/// `duration1` ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseCode {
    /// Output level of the first half
    pub level0: bool,
    /// Ticks spent at `level0`
    pub duration0: u16,
    /// Output level of the second half
    pub level1: bool,
    /// Ticks spent at `level1`
    pub duration1: u16,
}

impl PulseCode {
    /// High-then-low descriptor, the shape of every encoded symbol
    pub const fn high_low(high_ticks: u16, low_ticks: u16) -> Self {
        Self {
            level0: true,
            duration0: high_ticks,
            level1: false,
            duration1: low_ticks,
        }
    }

    /// Shortest descriptor that keeps the line low
    pub const fn idle_low() -> Self {
        Self {
            level0: false,
            duration0: 1,
            level1: false,
            duration1: 1,
        }
    }
}

/// Result of one translator call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Translated {
    /// Whole source bytes consumed by this call
    pub bytes_consumed: usize,
    /// Descriptors written to the destination slice
    pub codes_produced: usize,
}

/// Translator was invoked without an active stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TranslateError;

/// Incremental converter from source bytes to pulse descriptors
///
/// The peripheral calls [`translate`](PulseTranslator::translate) repeatedly
/// while it plays back, always passing the source bytes that have not been
/// consumed yet and a destination window of free descriptor slots. The
/// translator consumes whole bytes only, so the next call starts at the
/// first bit of `src`.
pub trait PulseTranslator {
    /// Convert as much of `src` as fits in `dest`
    ///
    /// Returns `Translated::default()` when nothing more can be produced.
    fn translate(
        &mut self,
        src: &[u8],
        dest: &mut [PulseCode],
    ) -> Result<Translated, TranslateError>;
}

/// Pulse generator peripheral
///
/// Implementations own a single output channel. All transmit methods block
/// until the last descriptor has been played back.
pub trait PulseTrain {
    /// Error type for peripheral operations
    type Error;

    /// Claim and configure the channel
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Release the channel
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Play back a prepared descriptor sequence
    fn transmit(&mut self, codes: &[PulseCode]) -> Result<(), Self::Error>;

    /// Play back `src`, converting it on the fly with `translator`
    ///
    /// The peripheral keeps calling the translator with the remaining whole
    /// bytes of `src` until it reports that nothing more was produced.
    fn transmit_translated<T: PulseTranslator>(
        &mut self,
        src: &[u8],
        translator: &mut T,
    ) -> Result<(), Self::Error>;
}
