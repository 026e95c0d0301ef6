//! Hardware device abstraction layer for the tollgate controller.
//!
//! This crate provides trait-based abstractions for the peripherals a gate
//! controller talks to (the fingerprint sensor and the RFID tag reader) plus
//! mock implementations of them and of the GPIO lines used for the lights and
//! ultrasonic rangefinders.
//!
//! # Design Philosophy
//!
//! - **Non-blocking**: every capability call returns immediately. Waiting for
//!   a finger or for a frame to complete is the caller's state machine, not a
//!   blocked call.
//! - **Closed outcomes**: sensor status codes are mapped to small enums
//!   ([`ImageStatus`], [`ModelMatch`], [`ModelPresence`]) or to a
//!   [`HardwareError`], matched exhaustively at each call site.
//! - **Send**: devices can be moved into the tokio task that runs the tick loop.
//!
//! # Fingerprint Sensors
//!
//! ```
//! use tollgate_hardware::traits::FingerprintSensor;
//! use tollgate_hardware::types::{ImageStatus, TemplateBuffer};
//! use tollgate_hardware::Result;
//!
//! fn capture_first<F: FingerprintSensor>(sensor: &mut F) -> Result<bool> {
//!     match sensor.get_image()? {
//!         ImageStatus::Captured => {
//!             sensor.convert(TemplateBuffer::First)?;
//!             Ok(true)
//!         }
//!         ImageStatus::NoFinger => Ok(false),
//!     }
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a scripted fingerprint sensor, a tag byte
//! stream, and `embedded-hal` GPIO/delay mocks sharing a virtual microsecond
//! clock so ranging can be tested without hardware.

pub mod error;
pub mod mock;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{FingerprintSensor, TagByteSource};
pub use types::{
    DEFAULT_QUALITY_THRESHOLD, FingerSample, ImageStatus, MAX_QUALITY_SCORE, ModelMatch,
    ModelPresence, TemplateBuffer,
};
