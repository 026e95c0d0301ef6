//! Command surface of the gate.
//!
//! Commands arrive from an external route layer (web UI, CLI). Each one is
//! answered synchronously with a [`CommandReply`] or a [`CommandError`]
//! carrying the status code the route layer should return.

use serde::Serialize;
use thiserror::Error;

use tollgate_core::SlotId;
use tollgate_core::constants::{MAX_SLOT_ID, MIN_SLOT_ID};
use tollgate_hardware::HardwareError;
use tollgate_storage::{SlotOwner, StorageError};

/// A request to the gate controller.
///
/// Slot ids are raw so that range validation happens here and is reported
/// as [`CommandError::InvalidSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin a two-touch enrollment into `slot`.
    StartEnrollment { slot: i64 },

    /// Remove the fingerprint in `slot` and its owner metadata.
    DeleteSlot { slot: i64 },

    /// Remove every fingerprint and all owner metadata.
    DeleteAll,

    /// Occupied slots with their owner metadata.
    ListSlots,

    /// Attach owner metadata to `slot`.
    SaveOwner {
        slot: i64,
        owner: String,
        role: String,
    },
}

impl Command {
    /// Whether this command talks to the fingerprint sensor.
    pub fn uses_sensor(&self) -> bool {
        !matches!(self, Command::SaveOwner { .. })
    }
}

/// An occupied slot as reported by [`Command::ListSlots`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotEntry {
    pub slot: SlotId,

    #[serde(flatten)]
    pub owner: Option<SlotOwner>,
}

/// Successful command outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    EnrollmentStarted { slot: SlotId },
    Deleted { slot: SlotId },
    DeletedAll { count: usize },
    Slots { slots: Vec<SlotEntry> },
    OwnerSaved { slot: SlotId },
}

/// Failed command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Enrollment already in progress for slot {active}")]
    Conflict { active: SlotId },

    #[error("Slot id must be {}-{}, got {value}", MIN_SLOT_ID, MAX_SLOT_ID)]
    InvalidSlot { value: i64 },

    #[error("Fingerprint sensor error: {0}")]
    Sensor(#[from] HardwareError),

    #[error("Enrollment could not start: {0}")]
    Enrollment(#[source] tollgate_core::Error),

    #[error("Metadata store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Gate controller is not running")]
    Closed,
}

impl CommandError {
    /// HTTP-style status code for the route layer.
    pub fn status_code(&self) -> u16 {
        match self {
            CommandError::Conflict { .. } => 409,
            CommandError::InvalidSlot { .. } => 400,
            CommandError::Sensor(_) | CommandError::Enrollment(_) | CommandError::Storage(_) => 500,
            CommandError::Closed => 503,
        }
    }
}

/// Validate a raw slot id.
pub fn parse_slot(value: i64) -> Result<SlotId, CommandError> {
    SlotId::new(value).map_err(|_| CommandError::InvalidSlot { value })
}
