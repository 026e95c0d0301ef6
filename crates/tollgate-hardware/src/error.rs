//! Error types for hardware operations.
//!
//! This module defines error types specific to peripheral operations,
//! covering device disconnection, serial communication and fingerprint
//! sensor status codes.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The sensor could not take an image.
    #[error("Image capture error: {message}")]
    ImageCapture { message: String },

    /// The image could not be turned into a template.
    #[error("Template conversion error: {message}")]
    Conversion { message: String },

    /// Writing to sensor flash failed.
    #[error("Flash error: {message}")]
    FlashError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new image capture error.
    pub fn image_capture(message: impl Into<String>) -> Self {
        Self::ImageCapture {
            message: message.into(),
        }
    }

    /// Create a new template conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Create a new flash error.
    pub fn flash(message: impl Into<String>) -> Self {
        Self::FlashError {
            message: message.into(),
        }
    }
}
