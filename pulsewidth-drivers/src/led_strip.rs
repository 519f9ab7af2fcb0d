//! Addressable RGB LED strip
//!
//! Pixels are cached as GRB byte triplets, the order WS2812-class chips
//! shift them in, and pushed out as one `pixels * 24` bit frame:
//!
//! ```text
//! pixel 0              pixel 1
//! [ G7..G0 R7..R0 B7..B0 ][ G7..G0 R7..R0 B7..B0 ] ...
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut strip: LedStrip<_, 90> =
//!     LedStrip::with_shift_clock(spi, delay, &WS2812_TIMING, 30)?;
//! strip.init()?;
//! strip.set_pixel(0, 255, 0, 0)?;
//! strip.refresh(100)?;
//! ```

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use pulsewidth_core::{
    BufferedWaveform, ClockedShift, Encoder, EncoderError, TimingSpec, WaveformConfig,
};
use pulsewidth_hal::{PulseTrain, ShiftClock};

/// WS2812 symbol timing
pub const WS2812_TIMING: TimingSpec = TimingSpec::uniform(800, 450, 400, 850, 150, 50_000);

/// SK6812 symbol timing
pub const SK6812_TIMING: TimingSpec = TimingSpec::uniform(600, 600, 300, 900, 150, 80_000);

/// Bytes per pixel (G, R, B)
pub const BYTES_PER_PIXEL: usize = 3;

/// Coarsest pulse-train divider that still resolves LED timing (10 MHz ticks)
pub const MAX_STRIP_CLOCK_DIVIDER: u8 = 8;

/// LED strip with room for `BYTES / 3` pixels
pub struct LedStrip<E, const BYTES: usize> {
    encoder: E,
    pixels: Vec<u8, BYTES>,
}

impl<E: Encoder, const BYTES: usize> LedStrip<E, BYTES> {
    /// Create a strip of `count` pixels, all off
    ///
    /// Fails with [`EncoderError::ResourceExhausted`] if the pixel cache or
    /// the encoder buffer cannot hold a full frame.
    pub fn new(encoder: E, count: usize) -> Result<Self, EncoderError> {
        let capacity = encoder.max_payload_bits();
        if capacity != 0 && capacity < count * BYTES_PER_PIXEL * 8 {
            return Err(EncoderError::ResourceExhausted);
        }

        let mut pixels = Vec::new();
        pixels
            .resize(count * BYTES_PER_PIXEL, 0)
            .map_err(|_| EncoderError::ResourceExhausted)?;

        Ok(Self { encoder, pixels })
    }

    /// Claim the encoder's peripheral
    pub fn init(&mut self) -> Result<(), EncoderError> {
        self.encoder.init()
    }

    /// Release the encoder's peripheral
    pub fn deinit(&mut self) -> Result<(), EncoderError> {
        self.encoder.deinit()
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.pixels.len() / BYTES_PER_PIXEL
    }

    /// Check if the strip has no pixels
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Set one pixel in the cache; takes effect on the next refresh
    pub fn set_pixel(&mut self, index: usize, red: u8, green: u8, blue: u8) -> Result<(), EncoderError> {
        if index >= self.len() {
            return Err(EncoderError::InvalidArgument);
        }
        let start = index * BYTES_PER_PIXEL;
        self.pixels[start..start + BYTES_PER_PIXEL].copy_from_slice(&[green, red, blue]);
        Ok(())
    }

    /// Cached pixel bytes in wire order
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Send the cached frame, then hold the line low so it latches
    ///
    /// Transmission always runs to completion; `_timeout_ms` is accepted for
    /// API compatibility and not enforced.
    pub fn refresh(&mut self, _timeout_ms: u32) -> Result<(), EncoderError> {
        self.encoder.send(&self.pixels, self.pixels.len() * 8)?;
        self.encoder.ensure_reset()
    }

    /// Turn every pixel off and refresh
    pub fn clear(&mut self, timeout_ms: u32) -> Result<(), EncoderError> {
        self.pixels.iter_mut().for_each(|b| *b = 0);
        self.refresh(timeout_ms)
    }

    /// Give back the encoder
    pub fn release(self) -> E {
        self.encoder
    }
}

impl<P: PulseTrain, D: DelayNs, const BYTES: usize> LedStrip<BufferedWaveform<P, D, 0>, BYTES> {
    /// Strip driven by a streaming pulse train
    ///
    /// No descriptor buffer is kept; the clock divider is capped at
    /// [`MAX_STRIP_CLOCK_DIVIDER`].
    pub fn with_pulse_train(
        pulse: P,
        delay: D,
        timing: &TimingSpec,
        config: WaveformConfig,
        count: usize,
    ) -> Result<Self, EncoderError> {
        let config = WaveformConfig {
            clock_divider: config.clock_divider.min(MAX_STRIP_CLOCK_DIVIDER),
            ..config
        };
        let encoder = BufferedWaveform::new(pulse, delay, timing, config, 0)?;
        Self::new(encoder, count)
    }
}

impl<S: ShiftClock, D: DelayNs, const BYTES: usize, const SHIFT_BYTES: usize>
    LedStrip<ClockedShift<S, D, SHIFT_BYTES>, BYTES>
{
    /// Strip driven by a clocked shifter holding one full frame
    pub fn with_shift_clock(
        shift: S,
        delay: D,
        timing: &TimingSpec,
        count: usize,
    ) -> Result<Self, EncoderError> {
        let encoder = ClockedShift::new(shift, delay, timing, count * BYTES_PER_PIXEL * 8)?;
        Self::new(encoder, count)
    }
}
