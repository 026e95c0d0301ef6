//! Tag frame reassembly from the reader's byte stream.
//!
//! The tag reader sends raw identifier bytes with no start or end marker.
//! Frame boundaries are inferred purely from timing: once the buffer holds a
//! full frame and the line has been quiet for the configured gap, the frame
//! is complete.
//!
//! # Framing Rules
//!
//! - Bytes beyond the frame width are discarded, never shifted in, so a
//!   stream with trailing noise cannot misalign the next frame
//! - Every received byte, kept or discarded, refreshes the activity instant;
//!   a stream that never pauses never completes a frame
//! - A partial frame left alone for longer than the staleness timeout is
//!   dropped
//! - Completed frames whose identifier is a sentinel (all `00`, all `FF`,
//!   the `00…01` "no tag" pattern, or a configured reserved id) are rejected
//!
//! # Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tollgate_rfid::{DecoderConfig, TagFrameDecoder};
//!
//! let mut decoder = TagFrameDecoder::new(DecoderConfig::default());
//! let t0 = Instant::now();
//!
//! decoder.feed(&[0x01, 0x02, 0x03, 0x04], t0);
//! assert!(decoder.next_frame(t0).is_none());
//!
//! let frame = decoder.next_frame(t0 + Duration::from_millis(100)).unwrap();
//! assert_eq!(frame.id().as_str(), "01020304");
//! ```

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use tollgate_core::constants::{DEFAULT_FRAME_STALE_MS, DEFAULT_QUIET_GAP_MS};
use tollgate_core::{Error, Result, TagId};

/// Recommended initial capacity for the completed frame queue.
const INITIAL_FRAME_QUEUE_CAPACITY: usize = 4;

/// Number of bytes in one tag frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum FrameWidth {
    #[default]
    Four,
    Eight,
}

impl FrameWidth {
    pub fn bytes(&self) -> usize {
        match self {
            FrameWidth::Four => 4,
            FrameWidth::Eight => 8,
        }
    }
}

impl TryFrom<usize> for FrameWidth {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            4 => Ok(FrameWidth::Four),
            8 => Ok(FrameWidth::Eight),
            other => Err(Error::Config(format!(
                "frame_width must be 4 or 8, got {other}"
            ))),
        }
    }
}

impl From<FrameWidth> for usize {
    fn from(width: FrameWidth) -> usize {
        width.bytes()
    }
}

/// Framing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub frame_width: FrameWidth,

    /// Silence after a full buffer that marks the frame complete.
    pub quiet_gap_ms: u64,

    /// Age after which a partial frame is dropped.
    pub frame_stale_ms: u64,

    /// Additional identifiers that never count as a tag.
    pub reserved_ids: Vec<TagId>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            frame_width: FrameWidth::default(),
            quiet_gap_ms: DEFAULT_QUIET_GAP_MS,
            frame_stale_ms: DEFAULT_FRAME_STALE_MS,
            reserved_ids: Vec::new(),
        }
    }
}

impl DecoderConfig {
    pub fn quiet_gap(&self) -> Duration {
        Duration::from_millis(self.quiet_gap_ms)
    }

    pub fn frame_stale(&self) -> Duration {
        Duration::from_millis(self.frame_stale_ms)
    }

    /// Every identifier rejected at this width.
    pub fn sentinels(&self) -> Vec<TagId> {
        let width = self.frame_width.bytes();
        let mut no_tag = vec![0x00; width];
        no_tag[width - 1] = 0x01;

        let mut sentinels: Vec<TagId> = [vec![0x00; width], vec![0xFF; width], no_tag]
            .iter()
            .filter_map(|bytes| TagId::from_bytes(bytes).ok())
            .collect();
        sentinels.extend(self.reserved_ids.iter().cloned());
        sentinels
    }
}

/// One complete, validated tag frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFrame {
    raw: Bytes,
    id: TagId,
}

impl TagFrame {
    /// Raw frame bytes as received.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn id(&self) -> &TagId {
        &self.id
    }

    pub fn into_id(self) -> TagId {
        self.id
    }
}

/// Where the decoder is in assembling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No bytes buffered.
    Empty,

    /// Fewer bytes than a frame.
    Partial,

    /// A full frame is buffered, waiting for the quiet gap.
    Full,
}

/// Counters kept by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    /// Frames handed out.
    pub frames: u64,

    /// Bytes dropped because the buffer was full.
    pub overflow_bytes: u64,

    /// Partial frames dropped as stale.
    pub stale_discards: u64,

    /// Complete frames rejected as sentinels.
    pub rejected_frames: u64,
}

/// Timing-based tag frame decoder.
///
/// # Thread Safety
///
/// Not shared between threads; the tick loop owns it.
#[derive(Debug)]
pub struct TagFrameDecoder {
    config: DecoderConfig,
    sentinels: Vec<TagId>,
    buffer: BytesMut,
    last_activity: Option<Instant>,
    frames: VecDeque<TagFrame>,
    stats: DecoderStats,
}

impl TagFrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        let sentinels = config.sentinels();
        let width = config.frame_width.bytes();
        Self {
            config,
            sentinels,
            buffer: BytesMut::with_capacity(width),
            last_activity: None,
            frames: VecDeque::with_capacity(INITIAL_FRAME_QUEUE_CAPACITY),
            stats: DecoderStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn state(&self) -> DecoderState {
        match self.buffer.len() {
            0 => DecoderState::Empty,
            n if n < self.config.frame_width.bytes() => DecoderState::Partial,
            _ => DecoderState::Full,
        }
    }

    /// Bytes currently buffered toward the next frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Feed bytes received at `now`.
    ///
    /// A frame that was already complete before these bytes arrived is
    /// finalized first, so late polling never merges two frames.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) {
        if bytes.is_empty() {
            return;
        }
        self.expire(now);

        let width = self.config.frame_width.bytes();
        let room = width.saturating_sub(self.buffer.len());
        let kept = room.min(bytes.len());
        self.buffer.extend_from_slice(&bytes[..kept]);

        let discarded = bytes.len() - kept;
        if discarded > 0 {
            self.stats.overflow_bytes += discarded as u64;
            debug!("{}", Error::FrameOverflow { discarded });
        }

        trace!(kept, buffered = self.buffer.len(), "Fed tag bytes");
        self.last_activity = Some(now);
    }

    /// Extract the next complete frame, if any, as of `now`.
    pub fn next_frame(&mut self, now: Instant) -> Option<TagFrame> {
        self.expire(now);
        self.frames.pop_front()
    }

    /// Drain every frame complete as of `now`.
    pub fn drain_frames(&mut self, now: Instant) -> DrainFrames<'_> {
        self.expire(now);
        DrainFrames { decoder: self }
    }

    /// Number of frames ready for extraction.
    pub fn frames_available(&self) -> usize {
        self.frames.len()
    }

    /// Drop buffered bytes and queued frames.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.frames.clear();
        self.last_activity = None;
    }

    /// Apply the quiet-gap and staleness rules at `now`.
    fn expire(&mut self, now: Instant) {
        let Some(last) = self.last_activity else {
            return;
        };
        let idle = now.saturating_duration_since(last);

        match self.state() {
            DecoderState::Empty => {}
            DecoderState::Full => {
                if idle >= self.config.quiet_gap() {
                    self.finalize();
                }
            }
            DecoderState::Partial => {
                if idle > self.config.frame_stale() {
                    self.stats.stale_discards += 1;
                    debug!(
                        bytes = self.buffer.len(),
                        "{}",
                        Error::FrameStale {
                            age_ms: idle.as_millis() as u64
                        }
                    );
                    self.buffer.clear();
                    self.last_activity = None;
                }
            }
        }
    }

    fn finalize(&mut self) {
        let raw = self.buffer.split().freeze();
        self.last_activity = None;

        if raw.len() != self.config.frame_width.bytes() {
            self.stats.rejected_frames += 1;
            return;
        }

        let id = match TagId::from_bytes(&raw) {
            Ok(id) => id,
            Err(e) => {
                self.stats.rejected_frames += 1;
                debug!(error = %e, "Dropped undecodable frame");
                return;
            }
        };

        if self.sentinels.contains(&id) {
            self.stats.rejected_frames += 1;
            debug!("{}", Error::InvalidTag(format!("sentinel {id}")));
            return;
        }

        self.stats.frames += 1;
        debug!(tag = %id, "Decoded tag frame");
        self.frames.push_back(TagFrame { raw, id });
    }
}

impl Default for TagFrameDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

/// Iterator that drains frames from a [`TagFrameDecoder`].
pub struct DrainFrames<'a> {
    decoder: &'a mut TagFrameDecoder,
}

impl Iterator for DrainFrames<'_> {
    type Item = TagFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.frames.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.decoder.frames.len();
        (len, Some(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_single_frame_after_quiet_gap() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02, 0x03, 0x04], t0);
        assert_eq!(decoder.state(), DecoderState::Full);
        assert!(decoder.next_frame(t0 + ms(99)).is_none());

        let frame = decoder.next_frame(t0 + ms(100)).unwrap();
        assert_eq!(frame.id().as_str(), "01020304");
        assert_eq!(frame.raw().as_ref(), &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decoder.state(), DecoderState::Empty);
        assert!(decoder.next_frame(t0 + ms(500)).is_none());
    }

    #[test]
    fn test_bytes_split_across_reads() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0xAB], t0);
        decoder.feed(&[0xCD, 0xEF], t0 + ms(10));
        decoder.feed(&[0x12], t0 + ms(20));

        let frame = decoder.next_frame(t0 + ms(120)).unwrap();
        assert_eq!(frame.id().as_str(), "ABCDEF12");
    }

    #[test]
    fn test_trailing_bytes_are_discarded() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06], t0);
        let frame = decoder.next_frame(t0 + ms(100)).unwrap();
        assert_eq!(frame.id().as_str(), "01020304");
        assert_eq!(decoder.stats().overflow_bytes, 2);
        assert_eq!(decoder.frames_available(), 0);
    }

    #[test]
    fn test_overflow_refreshes_activity() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02, 0x03, 0x04], t0);
        decoder.feed(&[0x09], t0 + ms(50));
        assert!(decoder.next_frame(t0 + ms(120)).is_none());
        assert!(decoder.next_frame(t0 + ms(150)).is_some());
    }

    #[test]
    fn test_never_pausing_stream_yields_nothing() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        for i in 0..200 {
            let now = t0 + ms(i * 50);
            decoder.feed(&[0x42], now);
            assert!(decoder.next_frame(now).is_none());
        }
        assert_eq!(decoder.stats().frames, 0);
    }

    #[test]
    fn test_stale_partial_frame_dropped() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02], t0);
        assert!(decoder.next_frame(t0 + ms(500)).is_none());
        assert_eq!(decoder.state(), DecoderState::Partial);

        assert!(decoder.next_frame(t0 + ms(501)).is_none());
        assert_eq!(decoder.state(), DecoderState::Empty);
        assert_eq!(decoder.stats().stale_discards, 1);

        // The next frame starts clean
        decoder.feed(&[0x0A, 0x0B, 0x0C, 0x0D], t0 + ms(600));
        let frame = decoder.next_frame(t0 + ms(700)).unwrap();
        assert_eq!(frame.id().as_str(), "0A0B0C0D");
    }

    #[test]
    fn test_complete_frame_finalized_before_new_bytes() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02, 0x03, 0x04], t0);
        decoder.feed(&[0x05, 0x06, 0x07, 0x08], t0 + ms(150));

        let frames: Vec<_> = decoder.drain_frames(t0 + ms(250)).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id().as_str(), "01020304");
        assert_eq!(frames[1].id().as_str(), "05060708");
    }

    #[rstest]
    #[case(&[0x00, 0x00, 0x00, 0x00])]
    #[case(&[0xFF, 0xFF, 0xFF, 0xFF])]
    #[case(&[0x00, 0x00, 0x00, 0x01])]
    fn test_sentinels_rejected(#[case] bytes: &[u8]) {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();

        decoder.feed(bytes, t0);
        assert!(decoder.next_frame(t0 + ms(100)).is_none());
        assert_eq!(decoder.stats().rejected_frames, 1);
    }

    #[test]
    fn test_reserved_ids_rejected() {
        let config = DecoderConfig {
            reserved_ids: vec![TagId::parse("DEADBEEF").unwrap()],
            ..DecoderConfig::default()
        };
        let mut decoder = TagFrameDecoder::new(config);
        let t0 = Instant::now();

        decoder.feed(&[0xDE, 0xAD, 0xBE, 0xEF], t0);
        assert!(decoder.next_frame(t0 + ms(100)).is_none());
    }

    #[test]
    fn test_eight_byte_frames() {
        let config = DecoderConfig {
            frame_width: FrameWidth::Eight,
            ..DecoderConfig::default()
        };
        let mut decoder = TagFrameDecoder::new(config);
        let t0 = Instant::now();

        decoder.feed(&[0x01, 0x02, 0x03, 0x04], t0);
        assert!(decoder.next_frame(t0 + ms(100)).is_none());

        decoder.feed(&[0x05, 0x06, 0x07, 0x08], t0 + ms(150));
        let frame = decoder.next_frame(t0 + ms(250)).unwrap();
        assert_eq!(frame.id().as_str(), "0102030405060708");
    }

    #[test]
    fn test_eight_byte_sentinels() {
        let config = DecoderConfig {
            frame_width: FrameWidth::Eight,
            ..DecoderConfig::default()
        };
        let sentinels = config.sentinels();
        assert!(sentinels.contains(&TagId::parse("0000000000000001").unwrap()));
        assert!(sentinels.contains(&TagId::parse("FFFFFFFFFFFFFFFF").unwrap()));
    }

    #[test]
    fn test_frame_width_conversion() {
        assert_eq!(FrameWidth::try_from(4).unwrap(), FrameWidth::Four);
        assert_eq!(FrameWidth::try_from(8).unwrap(), FrameWidth::Eight);
        assert!(FrameWidth::try_from(6).is_err());
        assert_eq!(usize::from(FrameWidth::Eight), 8);
    }

    #[test]
    fn test_clear() {
        let mut decoder = TagFrameDecoder::default();
        let t0 = Instant::now();
        decoder.feed(&[0x01, 0x02], t0);
        decoder.clear();
        assert_eq!(decoder.state(), DecoderState::Empty);
        assert!(decoder.buffered().is_empty());
    }
}
