//! Gate configuration.
//!
//! Loaded from TOML. Every section and key is optional and falls back to the
//! defaults in [`tollgate_core::constants`]. A loaded configuration must pass
//! [`GateConfig::validate`] before it is used.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tollgate_biometric::EnrollmentConfig;
use tollgate_core::constants::{
    DEFAULT_CONFIRMATIONS, DEFAULT_DEDUP_WINDOW_MS, DEFAULT_ECHO_TIMEOUT_MS,
    DEFAULT_FRAME_STALE_MS, DEFAULT_QUIET_GAP_MS, DEFAULT_READ_STALE_MS,
    DEFAULT_STATS_INTERVAL_MS, DEFAULT_TICK_MS,
};
use tollgate_core::{Error, Result, TagId};
use tollgate_rfid::{DecoderConfig, DedupConfig, FrameWidth};
use tollgate_traffic::{AlarmConfig, PhaseTimings, Polarity, PresenceBand};

/// Complete gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub runtime: RuntimeConfig,
    pub presence: PresenceBand,
    pub traffic: PhaseTimings,
    pub alarm: AlarmConfig,
    pub outputs: OutputsConfig,
    pub rfid: RfidConfig,
    pub enrollment: EnrollmentConfig,
}

/// Tick loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_ms: u64,

    /// Longest a single ultrasonic reading may wait for its echo.
    pub echo_timeout_ms: u64,

    /// Interval between read statistics log lines. Zero disables them.
    pub stats_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            echo_timeout_ms: DEFAULT_ECHO_TIMEOUT_MS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
        }
    }
}

impl RuntimeConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_ms > 0).then(|| Duration::from_millis(self.stats_interval_ms))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    pub polarity: Polarity,
}

/// Tag reader framing and deduplication, as one TOML table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfidConfig {
    pub frame_width: FrameWidth,
    pub quiet_gap_ms: u64,
    pub frame_stale_ms: u64,
    pub confirmations: u32,
    pub read_stale_ms: u64,
    pub dedup_window_ms: u64,

    /// Extra identifiers that never count as a tag.
    pub reserved_ids: Vec<TagId>,
}

impl Default for RfidConfig {
    fn default() -> Self {
        Self {
            frame_width: FrameWidth::default(),
            quiet_gap_ms: DEFAULT_QUIET_GAP_MS,
            frame_stale_ms: DEFAULT_FRAME_STALE_MS,
            confirmations: DEFAULT_CONFIRMATIONS,
            read_stale_ms: DEFAULT_READ_STALE_MS,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            reserved_ids: Vec::new(),
        }
    }
}

impl RfidConfig {
    pub fn decoder(&self) -> DecoderConfig {
        DecoderConfig {
            frame_width: self.frame_width,
            quiet_gap_ms: self.quiet_gap_ms,
            frame_stale_ms: self.frame_stale_ms,
            reserved_ids: self.reserved_ids.clone(),
        }
    }

    pub fn dedup(&self) -> DedupConfig {
        DedupConfig {
            confirmations: self.confirmations,
            read_stale_ms: self.read_stale_ms,
            dedup_window_ms: self.dedup_window_ms,
        }
    }
}

impl GateConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document does not parse or fails
    /// validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GateConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "Loaded gate configuration");
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let band = &self.presence;
        if band.min_m.is_nan() || band.min_m <= 0.0 {
            return Err(invalid(format!(
                "presence.min_m must be positive, got {}",
                band.min_m
            )));
        }
        if band.max_m.is_nan() || band.min_m >= band.max_m {
            return Err(invalid(format!(
                "presence.min_m ({}) must be below presence.max_m ({})",
                band.min_m, band.max_m
            )));
        }

        let holds = [
            ("traffic.red_ms", self.traffic.red_ms),
            ("traffic.red_amber_ms", self.traffic.red_amber_ms),
            ("traffic.green_ms", self.traffic.green_ms),
            ("traffic.amber_ms", self.traffic.amber_ms),
        ];
        if let Some((key, _)) = holds.iter().find(|(_, ms)| *ms == 0) {
            return Err(invalid(format!("{key} must be greater than zero")));
        }

        if self.rfid.confirmations == 0 {
            return Err(invalid("rfid.confirmations must be at least 1"));
        }
        if self.rfid.quiet_gap_ms >= self.rfid.frame_stale_ms {
            return Err(invalid(format!(
                "rfid.quiet_gap_ms ({}) must be below rfid.frame_stale_ms ({})",
                self.rfid.quiet_gap_ms, self.rfid.frame_stale_ms
            )));
        }
        if let Some(id) = self
            .rfid
            .reserved_ids
            .iter()
            .find(|id| id.byte_len() != self.rfid.frame_width.bytes())
        {
            return Err(invalid(format!(
                "rfid.reserved_ids entry {id} does not match frame_width {}",
                self.rfid.frame_width.bytes()
            )));
        }

        if self.enrollment.stage_timeout_ms == 0 {
            return Err(invalid("enrollment.stage_timeout_ms must be greater than zero"));
        }

        if self.runtime.tick_ms == 0 {
            return Err(invalid("runtime.tick_ms must be greater than zero"));
        }
        if self.runtime.echo_timeout_ms >= self.runtime.tick_ms {
            return Err(invalid(format!(
                "runtime.echo_timeout_ms ({}) must be shorter than runtime.tick_ms ({})",
                self.runtime.echo_timeout_ms, self.runtime.tick_ms
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}
