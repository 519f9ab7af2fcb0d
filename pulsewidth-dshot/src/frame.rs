//! DShot packet encoding and decoding
//!
//! Packet layout (before the wire byte swap):
//! - bits 15..5: value (0 = disarmed / command range 0-47, 48-2047 throttle)
//! - bit 4: telemetry request
//! - bits 3..0: checksum, XOR of the three nibbles above it

use pulsewidth_core::EncoderError;

use crate::command::Command;

/// Bits per DShot frame
pub const FRAME_BITS: usize = 16;

/// Highest throttle accepted by [`Packet::throttle`]
pub const MAX_THROTTLE: u16 = 2000;

/// Added to a non-zero throttle to skip the command range
pub const THROTTLE_OFFSET: u16 = 47;

const VALUE_SHIFT: u16 = 5;
const TELEMETRY_BIT: u16 = 1 << 4;
const CHECKSUM_MASK: u16 = 0x0F;
const VALUE_MASK: u16 = 0x07FF;

/// One 16-bit DShot packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet(u16);

impl Packet {
    /// Packet carrying `value` (11 bits) with a freshly computed checksum
    pub const fn from_value(value: u16, telemetry: bool) -> Self {
        let mut raw = (value & VALUE_MASK) << VALUE_SHIFT;
        if telemetry {
            raw |= TELEMETRY_BIT;
        }
        Self(raw | checksum(raw))
    }

    /// Throttle packet, 0 meaning disarmed
    ///
    /// Fails with [`EncoderError::InvalidArgument`] above [`MAX_THROTTLE`].
    pub fn throttle(thrust: u16, telemetry: bool) -> Result<Self, EncoderError> {
        if thrust > MAX_THROTTLE {
            return Err(EncoderError::InvalidArgument);
        }
        let value = if thrust == 0 {
            0
        } else {
            thrust + THROTTLE_OFFSET
        };
        Ok(Self::from_value(value, telemetry))
    }

    /// Special command packet
    pub const fn command(command: Command, telemetry: bool) -> Self {
        Self::from_value(command as u16, telemetry)
    }

    /// Wrap a raw received word without validating it
    pub const fn decode(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw 16-bit word, checksum included
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// 11-bit value field
    pub const fn value(&self) -> u16 {
        self.0 >> VALUE_SHIFT
    }

    /// Throttle in 1..=2000, `None` for the command range
    pub fn thrust(&self) -> Option<u16> {
        self.value().checked_sub(THROTTLE_OFFSET).filter(|&t| t > 0)
    }

    /// Telemetry request flag
    pub const fn telemetry(&self) -> bool {
        self.0 & TELEMETRY_BIT != 0
    }

    /// Embedded checksum nibble
    pub const fn checksum(&self) -> u16 {
        self.0 & CHECKSUM_MASK
    }

    /// Whether the embedded checksum matches the payload
    pub const fn is_valid(&self) -> bool {
        checksum(self.0) == self.checksum()
    }

    /// Bytes in transmit order
    ///
    /// The word is byte-swapped from its little-endian layout so the encoder,
    /// reading MSB first, sees bit 15 first.
    pub const fn to_wire_bytes(&self) -> [u8; 2] {
        self.0.swap_bytes().to_le_bytes()
    }
}

/// XOR of the three nibbles above the checksum field
const fn checksum(raw: u16) -> u16 {
    let data = raw >> 4;
    (data ^ (data >> 4) ^ (data >> 8)) & CHECKSUM_MASK
}
