//! Value types exchanged with peripheral devices.
//!
//! Every fingerprint capability call returns a closed variant so callers
//! match exhaustively instead of comparing raw sensor status codes.

use serde::{Deserialize, Serialize};

/// Default minimum image quality for a successful template conversion.
pub const DEFAULT_QUALITY_THRESHOLD: u8 = 50;

/// Maximum image quality score.
pub const MAX_QUALITY_SCORE: u8 = 100;

/// Outcome of asking the sensor for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    /// An image is now held in the sensor's image buffer.
    Captured,

    /// Nothing on the sensor window.
    NoFinger,
}

/// Character buffer a converted template is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateBuffer {
    First,
    Second,
}

impl TemplateBuffer {
    /// Buffer index as used on the sensor wire protocol (1 or 2).
    pub fn index(&self) -> u8 {
        match self {
            TemplateBuffer::First => 1,
            TemplateBuffer::Second => 2,
        }
    }
}

/// Outcome of combining both template buffers into a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMatch {
    /// The two templates belong to one finger; a model was created.
    Created,

    /// The two templates do not correspond to the same finger.
    Mismatch,
}

/// Whether a slot holds a stored model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPresence {
    Exists,
    Absent,
}

/// A finger presented to a (mock) sensor.
///
/// Holds the raw template and an image quality score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerSample {
    pub template: Vec<u8>,
    pub quality: u8,
}

impl FingerSample {
    pub fn new(template: Vec<u8>, quality: u8) -> Self {
        Self {
            template,
            quality: quality.min(MAX_QUALITY_SCORE),
        }
    }

    /// Check if quality meets the default threshold.
    pub fn is_quality_acceptable(&self) -> bool {
        self.is_quality_acceptable_with_threshold(DEFAULT_QUALITY_THRESHOLD)
    }

    /// Check if quality meets a custom threshold.
    pub fn is_quality_acceptable_with_threshold(&self, threshold: u8) -> bool {
        self.quality >= threshold
    }
}
