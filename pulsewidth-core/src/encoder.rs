//! Backend interface
//!
//! Every backend turns a logical bitstream into its peripheral's native
//! playback format. Bits are taken MSB first within each byte:
//!
//! ```text
//!        data[0]                 data[1]                 data[2]
//! [ 7 6 5 4 3 2 1 0 ] [ 15 14 13 12 11 10 9 8 ] [ 23 22 x x x x x x ]
//!                      ||  len_bits = 18
//! [ 7 6 5 4 3 2 1 0 15 14 13 12 11 10 9 8 23 22 ]
//! ```
//!
//! A backend either owns an outgoing buffer sized for
//! [`max_payload_bits`](Encoder::max_payload_bits) and works in
//! convert-then-write fashion, or has no buffer (`max_payload_bits() == 0`)
//! and translates while transmitting.

use crate::error::EncoderError;

/// Pulse-width encoder backend
///
/// Construction validates the timing; [`init`](Encoder::init) then claims
/// the peripheral. Calls on one encoder must be serialized by the caller.
pub trait Encoder {
    /// Claim and configure the peripheral
    ///
    /// Fails with [`EncoderError::InvalidState`] if already initialized.
    fn init(&mut self) -> Result<(), EncoderError>;

    /// Release the peripheral
    ///
    /// Fails with [`EncoderError::InvalidState`] if not initialized.
    fn deinit(&mut self) -> Result<(), EncoderError>;

    /// Largest payload accepted by [`convert_buffer`](Encoder::convert_buffer),
    /// in bits. Zero means the encoder only streams.
    fn max_payload_bits(&self) -> usize;

    /// Whether [`on_the_fly_send`](Encoder::on_the_fly_send) is available
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Encode the first `len_bits` bits of `data` into the outgoing buffer
    ///
    /// Returns the number of output units to hand to
    /// [`write`](Encoder::write). This is backend-specific and may exceed
    /// `len_bits`.
    fn convert_buffer(&mut self, data: &[u8], len_bits: usize) -> Result<usize, EncoderError>;

    /// Transmit the first `len` output units of the outgoing buffer
    ///
    /// Blocks until the peripheral has finished.
    fn write(&mut self, len: usize) -> Result<(), EncoderError>;

    /// Translate and transmit `data` without an outgoing buffer
    fn on_the_fly_send(&mut self, _data: &[u8], _len_bits: usize) -> Result<(), EncoderError> {
        Err(EncoderError::UnsupportedOperation)
    }

    /// Hold the line low for at least the protocol reset time
    fn ensure_reset(&mut self) -> Result<(), EncoderError>;

    /// Transmit `len_bits` bits of `data` using whichever path the encoder has
    fn send(&mut self, data: &[u8], len_bits: usize) -> Result<(), EncoderError> {
        if self.max_payload_bits() == 0 {
            if !self.supports_streaming() {
                return Err(EncoderError::UnsupportedOperation);
            }
            return self.on_the_fly_send(data, len_bits);
        }

        check_payload(data, len_bits, self.max_payload_bits())?;
        let units = self.convert_buffer(data, len_bits)?;
        self.write(units)
    }
}

impl<E: Encoder + ?Sized> Encoder for &mut E {
    fn init(&mut self) -> Result<(), EncoderError> {
        (**self).init()
    }

    fn deinit(&mut self) -> Result<(), EncoderError> {
        (**self).deinit()
    }

    fn max_payload_bits(&self) -> usize {
        (**self).max_payload_bits()
    }

    fn supports_streaming(&self) -> bool {
        (**self).supports_streaming()
    }

    fn convert_buffer(&mut self, data: &[u8], len_bits: usize) -> Result<usize, EncoderError> {
        (**self).convert_buffer(data, len_bits)
    }

    fn write(&mut self, len: usize) -> Result<(), EncoderError> {
        (**self).write(len)
    }

    fn on_the_fly_send(&mut self, data: &[u8], len_bits: usize) -> Result<(), EncoderError> {
        (**self).on_the_fly_send(data, len_bits)
    }

    fn ensure_reset(&mut self) -> Result<(), EncoderError> {
        (**self).ensure_reset()
    }

    fn send(&mut self, data: &[u8], len_bits: usize) -> Result<(), EncoderError> {
        (**self).send(data, len_bits)
    }
}

/// Validate a payload against the source slice and the encoder capacity
pub(crate) fn check_payload(
    data: &[u8],
    len_bits: usize,
    capacity_bits: usize,
) -> Result<(), EncoderError> {
    if len_bits > capacity_bits || len_bits > data.len() * 8 {
        return Err(EncoderError::InvalidArgument);
    }
    Ok(())
}

/// Logical bit `index` of `data`, MSB first
#[inline]
pub(crate) fn bit_at(data: &[u8], index: usize) -> bool {
    data[index / 8] & (0x80 >> (index % 8)) != 0
}
