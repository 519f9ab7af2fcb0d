//! Device drivers on top of the pulse-width encoders
//!
//! Drivers here only rely on the [`Encoder`](pulsewidth_core::Encoder)
//! `send` contract, so they work with either backend:
//!
//! - Addressable RGB LED strips (WS2812, SK6812)

#![no_std]
#![deny(unsafe_code)]

pub mod led_strip;

pub use led_strip::{LedStrip, SK6812_TIMING, WS2812_TIMING};
pub use pulsewidth_core::EncoderError;
