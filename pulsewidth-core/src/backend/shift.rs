//! Clocked-shift backend
//!
//! Approximates pulses with a plain serial shifter. A slot period is chosen
//! so that every symbol half is a whole number of slots, then each logical
//! bit is stuffed into the output as `high` one-bits followed by `low`
//! zero-bits:
//!
//! ```text
//! period 556 ns, one = 2/1 slots, zero = 1/2 slots
//!
//! logical   1     0     1     1
//! slots   1 1 0 1 0 0 1 1 0 1 1 0
//! ```
//!
//! Symbols straddle byte boundaries freely, so the output length is a bit
//! count that need not be a multiple of eight.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use pulsewidth_hal::{ShiftClock, ShiftClockConfig};

use crate::encoder::{bit_at, check_payload, Encoder};
use crate::error::EncoderError;
use crate::timing::{aligned_error, ceil_div, round_div, TimingSpec};

/// Largest slot multiple worth searching; beyond it the clock gets impractical
const MAX_SLOT_MULTIPLE: u32 = 4;

/// Result of the slot period search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotTiming {
    /// Chosen slot period in nanoseconds
    pub period_ns: u32,
    /// Worst quantization error over the four symbol halves
    pub max_error_ns: u32,
    /// Longest symbol half expressed in slots
    pub multiple: u32,
}

impl SlotTiming {
    /// Shift clock frequency for this period
    pub fn sclk_hz(&self) -> u32 {
        1_000_000_000 / self.period_ns
    }

    /// Whole slots needed for `duration_ns`
    pub fn slots(&self, duration_ns: u32) -> u32 {
        round_div(duration_ns, self.period_ns)
    }
}

/// Search for a slot period that represents every symbol half of `timing`
///
/// Candidates are scanned downward from `max + tolerance - 1` ns. A candidate
/// replaces the current best when it has lower error at no larger multiple,
/// or a larger multiple with at most half the error. Scanning stops once
/// the multiple exceeds four.
pub fn find_slot_timing(timing: &TimingSpec) -> Result<SlotTiming, EncoderError> {
    let durations = timing.durations();
    let tolerance = timing.mean_tolerance_ns();
    let longest = timing.max_duration_ns();
    let start = (longest + tolerance).saturating_sub(1);

    let mut best: Option<SlotTiming> = None;
    for period_ns in (2..=start).rev() {
        let multiple = round_div(longest, period_ns);
        if multiple > MAX_SLOT_MULTIPLE {
            break;
        }

        let max_error_ns = durations
            .iter()
            .map(|&d| aligned_error(d, period_ns))
            .max()
            .unwrap_or(0);
        if max_error_ns >= tolerance {
            continue;
        }

        let candidate = SlotTiming {
            period_ns,
            max_error_ns,
            multiple,
        };
        best = match best {
            None => Some(candidate),
            Some(current) => {
                // a finer slot has to at least halve the error
                let better = (max_error_ns < current.max_error_ns
                    && multiple <= current.multiple)
                    || (max_error_ns * 2 <= current.max_error_ns && multiple > current.multiple);
                Some(if better { candidate } else { current })
            }
        };
    }

    best.ok_or(EncoderError::InvalidTiming)
}

/// Slot counts of one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SymbolSlots {
    /// Leading one-bits
    pub high: usize,
    /// Trailing zero-bits
    pub low: usize,
}

impl SymbolSlots {
    fn total(&self) -> usize {
        self.high + self.low
    }
}

/// MSB-first bit packer that commits a byte only once all eight bits are known
struct SlotWriter<'a> {
    out: &'a mut [u8],
    offset: usize,
    carry: u8,
}

impl<'a> SlotWriter<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            offset: 0,
            carry: 0,
        }
    }

    fn put(&mut self, level: bool, mut count: usize) {
        while count > 0 {
            let bit = self.offset % 8;
            let run = count.min(8 - bit);
            if level {
                let mask = (0xFFu16 >> bit) & !(0xFFu16 >> (bit + run));
                self.carry |= mask as u8;
            }
            self.offset += run;
            count -= run;
            if self.offset % 8 == 0 {
                self.out[self.offset / 8 - 1] = self.carry;
                self.carry = 0;
            }
        }
    }

    fn put_symbol(&mut self, symbol: SymbolSlots) {
        self.put(true, symbol.high);
        self.put(false, symbol.low);
    }

    /// Flush the partial byte and return the number of bits written
    fn finish(self) -> usize {
        if self.offset % 8 != 0 {
            self.out[self.offset / 8] = self.carry;
        }
        self.offset
    }
}

/// Shift-clock backed encoder with `BYTES` bytes of output storage
pub struct ClockedShift<S, D, const BYTES: usize> {
    shift: S,
    delay: D,
    slot: SlotTiming,
    one: SymbolSlots,
    zero: SymbolSlots,
    reset_us: u32,
    max_payload_bits: usize,
    buffer_bytes: usize,
    buffer: Vec<u8, BYTES>,
    initialized: bool,
}

impl<S: ShiftClock, D: DelayNs, const BYTES: usize> ClockedShift<S, D, BYTES> {
    /// Create a backend, searching for a slot period that fits `timing`
    pub fn new(
        shift: S,
        delay: D,
        timing: &TimingSpec,
        max_payload_bits: usize,
    ) -> Result<Self, EncoderError> {
        let slot = match find_slot_timing(timing) {
            Ok(slot) => slot,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("shift: no slot period within tolerance");
                return Err(e);
            }
        };

        let one = SymbolSlots {
            high: slot.slots(timing.bit1_high_ns) as usize,
            low: slot.slots(timing.bit1_low_ns) as usize,
        };
        let zero = SymbolSlots {
            high: slot.slots(timing.bit0_high_ns) as usize,
            low: slot.slots(timing.bit0_low_ns) as usize,
        };

        let max_slots_per_bit = one.total().max(zero.total());
        let buffer_bytes = ceil_div(max_slots_per_bit * max_payload_bits, 8);
        if buffer_bytes > BYTES {
            return Err(EncoderError::ResourceExhausted);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "shift: period={}ns err={}ns sclk={}Hz one={}/{} zero={}/{}",
            slot.period_ns,
            slot.max_error_ns,
            slot.sclk_hz(),
            one.high,
            one.low,
            zero.high,
            zero.low
        );

        Ok(Self {
            shift,
            delay,
            slot,
            one,
            zero,
            reset_us: timing.reset_us(),
            max_payload_bits,
            buffer_bytes,
            buffer: Vec::new(),
            initialized: false,
        })
    }

    /// Chosen slot period
    pub fn slot_timing(&self) -> SlotTiming {
        self.slot
    }

    /// Slots of a logical 1
    pub fn one_slots(&self) -> SymbolSlots {
        self.one
    }

    /// Slots of a logical 0
    pub fn zero_slots(&self) -> SymbolSlots {
        self.zero
    }

    /// Reset idle time in microseconds
    pub fn reset_us(&self) -> u32 {
        self.reset_us
    }

    /// Shift clock configuration applied by `init`
    pub fn clock_config(&self) -> ShiftClockConfig {
        ShiftClockConfig {
            frequency_hz: self.slot.sclk_hz(),
            max_transfer_bytes: self.buffer_bytes,
        }
    }

    /// Output bytes of the last conversion
    pub fn output(&self) -> &[u8] {
        &self.buffer
    }

    /// Give back the shifter and delay provider
    pub fn release(self) -> (S, D) {
        (self.shift, self.delay)
    }

    fn require_initialized(&self) -> Result<(), EncoderError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EncoderError::InvalidState)
        }
    }
}

impl<S: ShiftClock, D: DelayNs, const BYTES: usize> Encoder for ClockedShift<S, D, BYTES> {
    fn init(&mut self) -> Result<(), EncoderError> {
        if self.initialized {
            return Err(EncoderError::InvalidState);
        }
        let config = self.clock_config();
        self.shift
            .enable(&config)
            .map_err(|_| EncoderError::HardwareFailure)?;
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), EncoderError> {
        self.require_initialized()?;
        self.shift
            .disable()
            .map_err(|_| EncoderError::HardwareFailure)?;
        self.initialized = false;
        Ok(())
    }

    fn max_payload_bits(&self) -> usize {
        self.max_payload_bits
    }

    fn convert_buffer(&mut self, data: &[u8], len_bits: usize) -> Result<usize, EncoderError> {
        check_payload(data, len_bits, self.max_payload_bits)?;

        self.buffer.clear();
        self.buffer
            .resize(self.buffer_bytes, 0)
            .map_err(|_| EncoderError::ResourceExhausted)?;

        let mut writer = SlotWriter::new(&mut self.buffer);
        for index in 0..len_bits {
            let symbol = if bit_at(data, index) { self.one } else { self.zero };
            writer.put_symbol(symbol);
        }
        Ok(writer.finish())
    }

    fn write(&mut self, len: usize) -> Result<(), EncoderError> {
        self.require_initialized()?;
        if len > self.buffer.len() * 8 {
            return Err(EncoderError::InvalidArgument);
        }
        self.shift
            .transmit(&self.buffer[..ceil_div(len, 8)], len)
            .map_err(|_| EncoderError::HardwareFailure)
    }

    fn ensure_reset(&mut self) -> Result<(), EncoderError> {
        self.require_initialized()?;
        self.delay.delay_us(self.reset_us);
        Ok(())
    }
}
