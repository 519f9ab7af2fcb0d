//! DShot ESC protocol over pulse-width encoders
//!
//! Every DShot frame is 16 bits sent MSB first:
//! ```text
//! ┌─────────────────────┬───────────┬──────────┐
//! │ VALUE               │ TELEMETRY │ CHECKSUM │
//! │ 11 bits             │ 1 bit     │ 4 bits   │
//! └─────────────────────┴───────────┴──────────┘
//! ```
//!
//! Values 0-47 are reserved for [`Command`]s; throttle 1-2000 maps to
//! 48-2047. ESCs disarm when frames stop arriving, so a [`DshotSession`]
//! keeps retransmitting the last staged frame at a fixed interval while the
//! application updates it at its own pace.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod frame;
pub mod session;
pub mod speed;

pub use command::Command;
pub use frame::{Packet, FRAME_BITS, MAX_THROTTLE};
pub use pulsewidth_core::EncoderError;
pub use session::DshotSession;
pub use speed::DshotSpeed;
