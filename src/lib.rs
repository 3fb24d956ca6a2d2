pub mod audio;
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod segment;

pub use config::Config;
pub use error::{Result, SegmentError};
pub use pipeline::{
    run_batch, segment_intervals, segment_waveform, print_summary, BatchOptions, BatchStats,
    FileReport, SegmentationResult,
};
pub use segment::{Segment, SegmentChain};
