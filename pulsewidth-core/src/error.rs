//! Encoder error type

use core::fmt;

/// Errors reported by encoders and their consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderError {
    /// Bad length, index, throttle or configuration value
    InvalidArgument,
    /// Timing cannot be represented by the backend within tolerance
    InvalidTiming,
    /// Streaming requested on a buffered encoder, or the other way round
    UnsupportedOperation,
    /// Requested buffer does not fit the encoder's storage
    ResourceExhausted,
    /// The peripheral reported a transmit or configuration failure
    HardwareFailure,
    /// Operation requires a different init state
    InvalidState,
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidTiming => "timing not representable within tolerance",
            Self::UnsupportedOperation => "operation not supported by this encoder",
            Self::ResourceExhausted => "encoder storage too small",
            Self::HardwareFailure => "peripheral failure",
            Self::InvalidState => "encoder in wrong state",
        };
        f.write_str(msg)
    }
}
