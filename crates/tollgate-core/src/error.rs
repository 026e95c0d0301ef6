use thiserror::Error;

use crate::types::SlotId;

#[derive(Error, Debug)]
pub enum Error {
    // Ranging
    #[error("No echo from sensor {sensor} within {timeout_ms}ms")]
    SensorTimeout { sensor: String, timeout_ms: u64 },

    // Tag framing
    #[error("Tag frame overflow: {discarded} byte(s) discarded")]
    FrameOverflow { discarded: usize },

    #[error("Partial tag frame discarded after {age_ms}ms")]
    FrameStale { age_ms: u64 },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    // Enrollment
    #[error("Enrollment for slot {slot} timed out")]
    EnrollmentTimeout { slot: SlotId },

    #[error("Fingerprints for slot {slot} did not match")]
    EnrollmentMismatch { slot: SlotId },

    #[error("Fingerprint sensor error during enrollment for slot {slot}")]
    EnrollmentSensorError { slot: SlotId },

    #[error("Fingerprint image for slot {slot} could not be converted")]
    EnrollmentLowQuality { slot: SlotId },

    #[error("Failed to create fingerprint model for slot {slot}")]
    ModelError { slot: SlotId },

    #[error("Could not store fingerprint in slot {slot}")]
    StorageFailure { slot: SlotId },

    #[error("Another enrollment is in progress (slot {active})")]
    ConflictingEnrollment { active: SlotId },

    // Validation
    #[error("Slot id must be {min}-{max}, got {value}")]
    InvalidSlot { value: i64, min: u8, max: u8 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
