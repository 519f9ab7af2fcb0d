//! Pulsewidth Hardware Abstraction Layer
//!
//! This crate defines the two peripheral contracts the encoders are built
//! on. Chip-specific crates implement them on top of their pulse generator
//! (RMT-style) and serial shifter (SPI-style) peripherals, so the same
//! encoding code runs unchanged on different hardware.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  LED strip / DShot session              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pulsewidth-core (Encoder backends)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pulsewidth-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  PulseTrain   │       │  ShiftClock   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`pulse::PulseTrain`] - Pulse generator driven by high/low descriptors
//! - [`pulse::PulseTranslator`] - Incremental byte-to-descriptor conversion
//! - [`shift::ShiftClock`] - Clocked serial shifter with a single data line

#![no_std]
#![deny(unsafe_code)]

pub mod pulse;
pub mod shift;

// Re-export key traits at crate root for convenience
pub use pulse::{PulseCode, PulseTrain, PulseTranslator, TranslateError, Translated};
pub use shift::{ShiftClock, ShiftClockConfig};
