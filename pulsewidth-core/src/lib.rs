//! Pulse-width encoding engine
//!
//! Turns logical bitstreams into precisely timed high/low pulse sequences
//! for single-wire devices:
//!
//! - [`TimingSpec`]: symbol durations and tolerances
//! - [`Encoder`]: the backend contract shared by every peripheral
//! - [`BufferedWaveform`]: pulse-descriptor backend with optional streaming
//! - [`ClockedShift`]: serial-shifter backend with slot period search

#![no_std]
#![deny(unsafe_code)]

pub mod backend;
pub mod encoder;
pub mod error;
pub mod timing;

pub use backend::shift::{find_slot_timing, ClockedShift, SlotTiming, SymbolSlots};
pub use backend::waveform::{BufferedWaveform, WaveformConfig, WaveformTranslator};
pub use encoder::Encoder;
pub use error::EncoderError;
pub use timing::TimingSpec;
