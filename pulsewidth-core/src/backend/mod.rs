//! Encoder backends
//!
//! | Backend | Peripheral | Buffer | Streaming |
//! |---------|------------|--------|-----------|
//! | [`waveform::BufferedWaveform`] | pulse train | one descriptor per bit | yes |
//! | [`shift::ClockedShift`] | clocked shifter | slot bits | no |

pub mod shift;
pub mod waveform;
