//! Gate events: the only artifact the controller hands to the outside world.
//!
//! Components never publish directly. They return a [`Notice`] (kind and
//! message) and the controller stamps it into a [`GateEvent`] before handing
//! it to the configured [`EventSink`]. Delivery is fire-and-forget.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a gate event, mirrored by the notification channel's
/// event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Progress information.
    Status,

    /// The user must act (place or lift a finger).
    Prompt,

    /// An operation failed.
    Error,

    /// An enrollment finished successfully.
    Done,

    /// A vehicle tag pass was confirmed.
    Rfid,
}

impl EventKind {
    /// Event name on the notification channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Status => "status",
            EventKind::Prompt => "prompt",
            EventKind::Error => "error",
            EventKind::Done => "done",
            EventKind::Rfid => "rfid",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unstamped event produced by a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: EventKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(EventKind::Status, message)
    }

    pub fn prompt(message: impl Into<String>) -> Self {
        Self::new(EventKind::Prompt, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, message)
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::new(EventKind::Done, message)
    }

    pub fn rfid(message: impl Into<String>) -> Self {
        Self::new(EventKind::Rfid, message)
    }

    /// Attach a timestamp (milliseconds since controller start).
    pub fn stamp(self, timestamp: u64) -> GateEvent {
        GateEvent {
            kind: self.kind,
            message: self.message,
            timestamp,
        }
    }
}

/// Event delivered to the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEvent {
    pub kind: EventKind,
    pub message: String,

    /// Milliseconds since the controller started.
    pub timestamp: u64,
}

/// Append-only, fire-and-forget event publisher.
///
/// Implementations must not block and must not fail the caller; an event
/// that cannot be delivered is dropped.
pub trait EventSink: Send {
    fn publish(&mut self, event: GateEvent);
}

/// Collects events in memory. Used by tests and the simulator.
impl EventSink for Vec<GateEvent> {
    fn publish(&mut self, event: GateEvent) {
        self.push(event);
    }
}
