//! Decoder and dedup tracker chained together.

use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::decoder::{DecoderConfig, DecoderStats, TagFrameDecoder};
use crate::dedup::{DedupConfig, ReadOutcome, VehicleDedupTracker, VehiclePass};

/// Counters across the whole tag pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RfidStats {
    pub decoder: DecoderStats,
    pub passes: u64,
}

/// Bytes in, vehicle passes out.
///
/// Frames are always decoded before the dedup check within one step.
#[derive(Debug)]
pub struct TagPipeline {
    decoder: TagFrameDecoder,
    tracker: VehicleDedupTracker,
}

impl TagPipeline {
    pub fn new(decoder: DecoderConfig, dedup: DedupConfig) -> Self {
        Self {
            decoder: TagFrameDecoder::new(decoder),
            tracker: VehicleDedupTracker::new(dedup),
        }
    }

    pub fn decoder(&self) -> &TagFrameDecoder {
        &self.decoder
    }

    pub fn tracker(&self) -> &VehicleDedupTracker {
        &self.tracker
    }

    /// Feed the bytes read this tick and collect any new passes.
    pub fn process(&mut self, bytes: &[u8], now: Instant) -> Vec<VehiclePass> {
        self.decoder.feed(bytes, now);

        let frames: Vec<_> = self.decoder.drain_frames(now).collect();
        frames
            .into_iter()
            .filter_map(|frame| match self.tracker.observe(frame.id(), now) {
                ReadOutcome::Pass(pass) => Some(pass),
                ReadOutcome::Accumulating { .. } | ReadOutcome::Suppressed => None,
            })
            .collect()
    }

    pub fn stats(&self) -> RfidStats {
        RfidStats {
            decoder: self.decoder.stats(),
            passes: self.tracker.passes(),
        }
    }

    /// Log the read statistics.
    pub fn log_stats(&self, uptime_secs: u64) {
        let stats = self.stats();
        info!(
            frames = stats.decoder.frames,
            vehicles = stats.passes,
            rejected = stats.decoder.rejected_frames,
            overflow_bytes = stats.decoder.overflow_bytes,
            stale = stats.decoder.stale_discards,
            uptime_secs,
            "Tag reader statistics"
        );
    }
}

impl Default for TagPipeline {
    fn default() -> Self {
        Self::new(DecoderConfig::default(), DedupConfig::default())
    }
}
