//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod fingerprint;
pub mod gpio;
pub mod tag_stream;

// Re-export commonly used types
pub use fingerprint::{MockFingerprint, MockFingerprintHandle};
pub use gpio::{
    ECHO_START_DELAY_US, MockDelay, MockEchoPin, MockOutputPin, MockPinFault, MockTriggerPin,
    UltrasonicRig,
};
pub use tag_stream::{MockTagStream, MockTagStreamHandle};
