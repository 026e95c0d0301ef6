//! Tag reader pipeline: frame reassembly from the serial byte stream,
//! consecutive-read confirmation and duplicate pass suppression.

pub mod decoder;
pub mod dedup;
pub mod pipeline;

pub use decoder::{
    DecoderConfig, DecoderState, DecoderStats, DrainFrames, FrameWidth, TagFrame,
    TagFrameDecoder,
};
pub use dedup::{
    DedupConfig, DedupRecord, ReadAggregate, ReadOutcome, VehicleDedupTracker, VehiclePass,
};
pub use pipeline::{RfidStats, TagPipeline};
