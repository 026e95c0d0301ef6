//! Default tuning values for the gate controller.
//!
//! Every value in this module is a default, not a law: the controller reads
//! its effective values from configuration and falls back to these when a
//! section or key is absent.
//!
//! # Units
//!
//! - Durations are milliseconds (`*_MS`).
//! - Distances are meters (`*_M`).
//!
//! # Usage
//!
//! ```
//! use tollgate_core::constants::*;
//! use std::time::Duration;
//!
//! let window = Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS);
//! assert_eq!(window.as_secs(), 5);
//!
//! fn inside_band(meters: f32) -> bool {
//!     (DEFAULT_PRESENCE_MIN_M..=DEFAULT_PRESENCE_MAX_M).contains(&meters)
//! }
//! assert!(inside_band(1.0));
//! ```

// ============================================================================
// Ranging
// ============================================================================

/// Meters travelled per microsecond of echo, halved for the round trip.
///
/// Sound covers roughly 0.034 cm/µs; the echo pulse spans the way out and
/// back, so one microsecond of echo is 0.017 cm = 0.000 17 m of range.
pub const METERS_PER_ECHO_MICROSECOND: f32 = 0.034 / 2.0 / 100.0;

/// Low settle time before the trigger pulse, in microseconds.
pub const TRIGGER_SETTLE_US: u32 = 2;

/// Trigger pulse high time, in microseconds (HC-SR04 requires at least 10).
pub const TRIGGER_PULSE_US: u32 = 10;

/// Polling step while waiting on the echo line, in microseconds.
pub const ECHO_POLL_STEP_US: u32 = 1;

/// Default echo timeout in milliseconds.
///
/// 20 ms of echo is about 3.4 m of range, comfortably past the presence
/// band while staying short relative to the tick.
pub const DEFAULT_ECHO_TIMEOUT_MS: u64 = 20;

// ============================================================================
// Presence
// ============================================================================

/// Lower bound of the presence band (inclusive).
///
/// Anything closer is near-field multipath noise and is rejected.
pub const DEFAULT_PRESENCE_MIN_M: f32 = 0.25;

/// Upper bound of the presence band (inclusive).
pub const DEFAULT_PRESENCE_MAX_M: f32 = 2.25;

// ============================================================================
// Traffic phases
// ============================================================================

/// Hold duration of the RED phase.
pub const DEFAULT_RED_MS: u64 = 30_000;

/// Hold duration of the RED_AMBER phase.
pub const DEFAULT_RED_AMBER_MS: u64 = 5_000;

/// Hold duration of the GREEN phase.
pub const DEFAULT_GREEN_MS: u64 = 30_000;

/// Hold duration of the AMBER phase.
pub const DEFAULT_AMBER_MS: u64 = 5_000;

/// Buzzer square-wave half period.
pub const DEFAULT_ALARM_TOGGLE_MS: u64 = 500;

// ============================================================================
// RFID framing and deduplication
// ============================================================================

/// Default tag frame width in bytes.
pub const DEFAULT_FRAME_WIDTH: usize = 4;

/// Largest supported tag frame width in bytes.
pub const MAX_FRAME_WIDTH: usize = 8;

/// Silence after the last byte that marks a frame as complete.
pub const DEFAULT_QUIET_GAP_MS: u64 = 100;

/// Age after which a partial frame is discarded.
pub const DEFAULT_FRAME_STALE_MS: u64 = 500;

/// Consecutive identical frames required to confirm a tag.
pub const DEFAULT_CONFIRMATIONS: u32 = 3;

/// Age after which an unreinforced read aggregate is dropped.
pub const DEFAULT_READ_STALE_MS: u64 = 2_000;

/// Minimum time before the same tag counts as a new pass.
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 5_000;

/// Baud rate of the tag reader serial link.
pub const DEFAULT_TAG_BAUD: u32 = 9_600;

// ============================================================================
// Fingerprint enrollment
// ============================================================================

/// Lowest fingerprint slot id accepted by the sensor.
pub const MIN_SLOT_ID: u8 = 1;

/// Highest fingerprint slot id accepted by the sensor.
pub const MAX_SLOT_ID: u8 = 127;

/// Time an enrollment stage may wait on the finger before failing.
pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 10_000;

// ============================================================================
// Runtime
// ============================================================================

/// Default polling tick.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Interval between read statistics log lines.
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 60_000;
