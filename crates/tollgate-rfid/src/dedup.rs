//! Vehicle pass confirmation and duplicate suppression.
//!
//! A decoded tag id becomes a vehicle pass in two steps. First it must be
//! read on several consecutive frames with no other id in between
//! (confirmation). Then a confirmed id only counts as a new pass if it differs
//! from the last confirmed id, or if the dedup window has elapsed since that
//! confirmation (suppression).

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use tollgate_core::TagId;
use tollgate_core::constants::{
    DEFAULT_CONFIRMATIONS, DEFAULT_DEDUP_WINDOW_MS, DEFAULT_READ_STALE_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Consecutive reads needed to confirm a tag.
    pub confirmations: u32,

    /// A candidate with no reinforcing read for this long starts over.
    pub read_stale_ms: u64,

    /// Minimum time before the same tag counts as a new pass.
    pub dedup_window_ms: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            read_stale_ms: DEFAULT_READ_STALE_MS,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
        }
    }
}

impl DedupConfig {
    pub fn read_stale(&self) -> Duration {
        Duration::from_millis(self.read_stale_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }
}

/// The tag currently accumulating consecutive reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAggregate {
    pub tag_id: TagId,
    pub consecutive_count: u32,
    pub first_seen_at: Instant,
    pub last_seen_at: Instant,
}

impl ReadAggregate {
    fn new(tag_id: TagId, now: Instant) -> Self {
        Self {
            tag_id,
            consecutive_count: 1,
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    fn is_stale(&self, now: Instant, read_stale: Duration) -> bool {
        now.saturating_duration_since(self.last_seen_at) > read_stale
    }
}

/// The most recent confirmed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupRecord {
    pub last_confirmed_tag_id: TagId,
    pub last_confirmed_at: Instant,
}

/// A confirmed, non-duplicate vehicle pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehiclePass {
    pub tag: TagId,

    /// Running count of passes since start, starting at 1.
    pub sequence: u64,

    pub confirmed_at: Instant,
}

/// What one decoded frame did to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Not confirmed yet; `count` consecutive reads so far.
    Accumulating { count: u32 },

    /// Confirmed, but the same tag passed within the dedup window.
    Suppressed,

    /// A new vehicle pass.
    Pass(VehiclePass),
}

/// Confirms tag reads and suppresses duplicate passes.
#[derive(Debug)]
pub struct VehicleDedupTracker {
    config: DedupConfig,
    aggregate: Option<ReadAggregate>,
    last_pass: Option<DedupRecord>,
    passes: u64,
}

impl VehicleDedupTracker {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            aggregate: None,
            last_pass: None,
            passes: 0,
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    pub fn aggregate(&self) -> Option<&ReadAggregate> {
        self.aggregate.as_ref()
    }

    pub fn last_pass(&self) -> Option<&DedupRecord> {
        self.last_pass.as_ref()
    }

    /// Vehicle passes emitted so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Record one decoded frame read at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use tollgate_core::TagId;
    /// use tollgate_rfid::{DedupConfig, ReadOutcome, VehicleDedupTracker};
    ///
    /// let mut tracker = VehicleDedupTracker::new(DedupConfig::default());
    /// let tag = TagId::parse("01020304").unwrap();
    /// let t0 = Instant::now();
    ///
    /// tracker.observe(&tag, t0);
    /// tracker.observe(&tag, t0 + Duration::from_millis(150));
    /// let outcome = tracker.observe(&tag, t0 + Duration::from_millis(300));
    /// assert!(matches!(outcome, ReadOutcome::Pass(_)));
    /// ```
    pub fn observe(&mut self, tag: &TagId, now: Instant) -> ReadOutcome {
        let read_stale = self.config.read_stale();

        let reinforcing = self
            .aggregate
            .as_mut()
            .filter(|agg| agg.tag_id == *tag && !agg.is_stale(now, read_stale));

        let count = if let Some(agg) = reinforcing {
            agg.consecutive_count += 1;
            agg.last_seen_at = now;
            agg.consecutive_count
        } else {
            if let Some(agg) = &self.aggregate {
                if agg.tag_id == *tag {
                    debug!(tag = %tag, "Stale read aggregate restarted");
                } else {
                    debug!(from = %agg.tag_id, to = %tag, "Read aggregate switched tag");
                }
            }
            self.aggregate = Some(ReadAggregate::new(tag.clone(), now));
            1
        };

        if count < self.config.confirmations {
            return ReadOutcome::Accumulating { count };
        }

        // Require a fresh run of reads before this tag can confirm again
        if let Some(agg) = self.aggregate.as_mut() {
            agg.consecutive_count = 0;
        }

        let within_window = self.last_pass.as_ref().is_some_and(|record| {
            record.last_confirmed_tag_id == *tag
                && now.saturating_duration_since(record.last_confirmed_at)
                    < self.config.dedup_window()
        });

        if within_window {
            debug!(tag = %tag, "Duplicate pass suppressed");
            return ReadOutcome::Suppressed;
        }

        self.passes += 1;
        self.last_pass = Some(DedupRecord {
            last_confirmed_tag_id: tag.clone(),
            last_confirmed_at: now,
        });
        info!(
            tag = %tag,
            decimal = tag.as_u64(),
            sequence = self.passes,
            "Vehicle pass confirmed"
        );

        ReadOutcome::Pass(VehiclePass {
            tag: tag.clone(),
            sequence: self.passes,
            confirmed_at: now,
        })
    }
}

impl Default for VehicleDedupTracker {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
