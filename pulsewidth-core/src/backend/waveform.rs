//! Buffered-waveform backend
//!
//! Drives a [`PulseTrain`] peripheral. Every logical bit becomes exactly one
//! [`PulseCode`] descriptor holding the symbol's high and low tick counts,
//! so the output unit count equals the input bit count.
//!
//! # Tick quantization
//!
//! The peripheral ticks at `source_clock_hz / clock_divider`. Each symbol
//! half is rounded to the nearest whole tick; construction fails when the
//! rounding error reaches the symbol's tolerance, or when a duration does
//! not fit the 15-bit descriptor field.
//!
//! # Streaming
//!
//! With `max_payload_bits == 0` no descriptor buffer is kept. Sends go
//! through [`WaveformTranslator`], which the peripheral calls back while it
//! plays, converting whole source bytes into free descriptor slots.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use pulsewidth_hal::pulse::MAX_PULSE_TICKS;
use pulsewidth_hal::{PulseCode, PulseTrain, PulseTranslator, TranslateError, Translated};

use crate::encoder::{bit_at, check_payload, Encoder};
use crate::error::EncoderError;
use crate::timing::{aligned_error, ceil_div, round_div, TimingSpec};

/// Nanoseconds per second
const NS_PER_SEC: u32 = 1_000_000_000;

/// Pulse-train clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveformConfig {
    /// Peripheral source clock in Hz
    pub source_clock_hz: u32,
    /// Divider applied to the source clock to get the tick rate
    pub clock_divider: u8,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            source_clock_hz: 80_000_000, // APB clock
            clock_divider: 4,            // 20 MHz, 50 ns ticks
        }
    }
}

impl WaveformConfig {
    /// Duration of one tick in whole nanoseconds
    pub fn min_step_ns(&self) -> Result<u32, EncoderError> {
        if self.clock_divider == 0 {
            return Err(EncoderError::InvalidArgument);
        }
        let tick_hz = self.source_clock_hz / self.clock_divider as u32;
        if tick_hz == 0 || tick_hz > NS_PER_SEC {
            return Err(EncoderError::InvalidArgument);
        }
        Ok(NS_PER_SEC / tick_hz)
    }
}

/// Byte-at-a-time translator used for streaming sends
///
/// The number of bits still to emit is armed once per send and counted down
/// across callbacks, so the last callback stops at the exact final bit even
/// when it is not byte-aligned.
#[derive(Debug, Clone)]
pub struct WaveformTranslator {
    one: PulseCode,
    zero: PulseCode,
    remaining_bits: Option<usize>,
}

impl WaveformTranslator {
    /// Create an unarmed translator for the given symbol descriptors
    pub fn new(one: PulseCode, zero: PulseCode) -> Self {
        Self {
            one,
            zero,
            remaining_bits: None,
        }
    }

    /// Start a stream of `total_bits` bits
    pub fn arm(&mut self, total_bits: usize) {
        self.remaining_bits = Some(total_bits);
    }

    /// End the current stream
    pub fn disarm(&mut self) {
        self.remaining_bits = None;
    }

    /// Bits still to be emitted, `None` when no stream is active
    pub fn remaining_bits(&self) -> Option<usize> {
        self.remaining_bits
    }
}

impl PulseTranslator for WaveformTranslator {
    fn translate(
        &mut self,
        src: &[u8],
        dest: &mut [PulseCode],
    ) -> Result<Translated, TranslateError> {
        let remaining = self.remaining_bits.as_mut().ok_or(TranslateError)?;
        let whole_bytes = dest.len() / 8;
        let mut out = Translated::default();

        for &byte in src.iter().take(whole_bytes) {
            if *remaining == 0 {
                break;
            }
            for bit in 0..8 {
                dest[out.codes_produced] = if byte & (0x80 >> bit) != 0 {
                    self.one
                } else {
                    self.zero
                };
                out.codes_produced += 1;
                *remaining -= 1;
                if *remaining == 0 {
                    break;
                }
            }
            out.bytes_consumed += 1;
        }

        Ok(out)
    }
}

/// Pulse-train backed encoder with room for `N` descriptors
pub struct BufferedWaveform<P, D, const N: usize> {
    pulse: P,
    delay: D,
    min_step_ns: u32,
    one: PulseCode,
    zero: PulseCode,
    reset_us: u32,
    max_payload_bits: usize,
    buffer: Vec<PulseCode, N>,
    translator: WaveformTranslator,
    initialized: bool,
}

impl<P: PulseTrain, D: DelayNs, const N: usize> BufferedWaveform<P, D, N> {
    /// Create a backend after checking that `timing` is representable
    ///
    /// `max_payload_bits` of zero selects streaming-only operation.
    pub fn new(
        pulse: P,
        delay: D,
        timing: &TimingSpec,
        config: WaveformConfig,
        max_payload_bits: usize,
    ) -> Result<Self, EncoderError> {
        let min_step_ns = config.min_step_ns()?;
        let max_period_ns = min_step_ns as u64 * MAX_PULSE_TICKS as u64;

        if timing
            .durations()
            .iter()
            .any(|&d| d as u64 > max_period_ns)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "waveform: pulse longer than {} ns, increase clock divider",
                max_period_ns
            );
            return Err(EncoderError::InvalidTiming);
        }

        let fits = timing
            .durations()
            .iter()
            .zip(timing.tolerances().iter())
            .all(|(&d, &tol)| aligned_error(d, min_step_ns) < tol);
        if !fits {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "waveform: {} ns ticks too coarse, decrease clock divider",
                min_step_ns
            );
            return Err(EncoderError::InvalidTiming);
        }

        if max_payload_bits > N {
            return Err(EncoderError::ResourceExhausted);
        }

        let ticks = |ns: u32| round_div(ns, min_step_ns) as u16;
        let one = PulseCode::high_low(ticks(timing.bit1_high_ns), ticks(timing.bit1_low_ns));
        let zero = PulseCode::high_low(ticks(timing.bit0_high_ns), ticks(timing.bit0_low_ns));

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "waveform: step={}ns one={}/{} zero={}/{}",
            min_step_ns,
            one.duration0,
            one.duration1,
            zero.duration0,
            zero.duration1
        );

        Ok(Self {
            pulse,
            delay,
            min_step_ns,
            one,
            zero,
            reset_us: timing.reset_us(),
            max_payload_bits,
            buffer: Vec::new(),
            translator: WaveformTranslator::new(one, zero),
            initialized: false,
        })
    }

    /// Tick length in nanoseconds
    pub fn min_step_ns(&self) -> u32 {
        self.min_step_ns
    }

    /// Descriptor emitted for a logical 1
    pub fn one_code(&self) -> PulseCode {
        self.one
    }

    /// Descriptor emitted for a logical 0
    pub fn zero_code(&self) -> PulseCode {
        self.zero
    }

    /// Reset hold time in microseconds
    pub fn reset_us(&self) -> u32 {
        self.reset_us
    }

    /// Descriptors produced by the last conversion
    pub fn codes(&self) -> &[PulseCode] {
        &self.buffer
    }

    /// Check if the peripheral is claimed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Give back the peripheral and delay provider
    pub fn release(self) -> (P, D) {
        (self.pulse, self.delay)
    }

    fn require_initialized(&self) -> Result<(), EncoderError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EncoderError::InvalidState)
        }
    }
}

impl<P: PulseTrain, D: DelayNs, const N: usize> Encoder for BufferedWaveform<P, D, N> {
    fn init(&mut self) -> Result<(), EncoderError> {
        if self.initialized {
            return Err(EncoderError::InvalidState);
        }
        self.pulse
            .enable()
            .map_err(|_| EncoderError::HardwareFailure)?;
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), EncoderError> {
        self.require_initialized()?;
        self.pulse
            .disable()
            .map_err(|_| EncoderError::HardwareFailure)?;
        self.initialized = false;
        Ok(())
    }

    fn max_payload_bits(&self) -> usize {
        self.max_payload_bits
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn convert_buffer(&mut self, data: &[u8], len_bits: usize) -> Result<usize, EncoderError> {
        check_payload(data, len_bits, self.max_payload_bits)?;

        self.buffer.clear();
        for index in 0..len_bits {
            let code = if bit_at(data, index) { self.one } else { self.zero };
            self.buffer
                .push(code)
                .map_err(|_| EncoderError::ResourceExhausted)?;
        }
        Ok(len_bits)
    }

    fn write(&mut self, len: usize) -> Result<(), EncoderError> {
        self.require_initialized()?;
        if len > self.buffer.len() {
            return Err(EncoderError::InvalidArgument);
        }
        self.pulse
            .transmit(&self.buffer[..len])
            .map_err(|_| EncoderError::HardwareFailure)
    }

    fn on_the_fly_send(&mut self, data: &[u8], len_bits: usize) -> Result<(), EncoderError> {
        if self.max_payload_bits != 0 {
            return Err(EncoderError::UnsupportedOperation);
        }
        self.require_initialized()?;
        if len_bits > data.len() * 8 {
            return Err(EncoderError::InvalidArgument);
        }
        if len_bits == 0 {
            return Ok(());
        }

        let src = &data[..ceil_div(len_bits, 8)];
        self.translator.arm(len_bits);
        let result = self.pulse.transmit_translated(src, &mut self.translator);
        self.translator.disarm();
        result.map_err(|_| EncoderError::HardwareFailure)
    }

    fn ensure_reset(&mut self) -> Result<(), EncoderError> {
        self.require_initialized()?;
        self.pulse
            .transmit(&[PulseCode::idle_low()])
            .map_err(|_| EncoderError::HardwareFailure)?;
        self.delay.delay_us(self.reset_us);
        Ok(())
    }
}
