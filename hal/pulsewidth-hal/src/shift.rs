//! Clocked-shift peripheral abstractions
//!
//! A clocked shifter (an SPI master with only its data-out line routed)
//! emits one buffer bit per clock period, MSB first. Holding the line high
//! or low for a number of consecutive bits approximates a pulse.

/// Clocked serial shifter
///
/// Only the data line is used; clock and chip-select are left unrouted.
/// Implementations run the bus in mode 0 (clock idling low, data valid on
/// the first edge) and hold the data line low between transfers, so the
/// gap after a frame reads as the reset pulse.
pub trait ShiftClock {
    /// Error type for shifter operations
    type Error;

    /// Claim the bus and configure it with `config`
    fn enable(&mut self, config: &ShiftClockConfig) -> Result<(), Self::Error>;

    /// Release the bus
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Shift out the first `len_bits` bits of `data`, MSB first
    ///
    /// Blocks until the transfer completes. Bits of `data` past `len_bits`
    /// are not clocked out.
    fn transmit(&mut self, data: &[u8], len_bits: usize) -> Result<(), Self::Error>;
}

/// Shifter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShiftClockConfig {
    /// Bit clock frequency in Hz
    pub frequency_hz: u32,
    /// Largest single transfer in bytes
    pub max_transfer_bytes: usize,
}

impl Default for ShiftClockConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000_000, // 1 MHz
            max_transfer_bytes: 0,
        }
    }
}
