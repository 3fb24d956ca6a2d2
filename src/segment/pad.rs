use std::fmt;

use tracing::{debug, warn};

use crate::config::Config;

use super::SegmentChain;

/// Trailing pad and the duration band clips are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadParams {
    pub sample_rate: u32,
    /// Extension applied to each end, in seconds.
    pub trailing_pad: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Length of the source in offset units; the last clip never runs past it.
    pub source_len: Option<u64>,
}

impl PadParams {
    pub fn from_config(config: &Config, sample_rate: u32, source_len: Option<u64>) -> Self {
        Self {
            sample_rate,
            trailing_pad: config.trailing_pad,
            min_duration: config.min_duration,
            max_duration: config.max_duration,
            source_len,
        }
    }

    /// Pad length in offset units.
    pub fn pad_units(&self) -> u64 {
        (self.trailing_pad.max(0.0) * self.sample_rate as f64) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandViolation {
    TooShort,
    TooLong,
}

impl fmt::Display for BandViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandViolation::TooShort => write!(f, "too short"),
            BandViolation::TooLong => write!(f, "too long"),
        }
    }
}

/// Advisory note about a clip whose merged duration is outside the band.
#[derive(Debug, Clone, PartialEq)]
pub struct OutOfBand {
    pub index: usize,
    pub duration: f64,
    pub violation: BandViolation,
}

/// Padded chain plus the clips a reviewer should look at.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedChain {
    pub chain: SegmentChain,
    pub diagnostics: Vec<OutOfBand>,
}

/// Flag out-of-band durations, then extend every clip end by the trailing pad.
///
/// The band is checked on the merged boundaries, so the pad alone never makes a
/// clip too long. The pad never reaches into the next clip or past the source
/// end. Flagged clips stay in the chain.
pub fn pad_and_validate(mut chain: SegmentChain, params: &PadParams) -> PaddedChain {
    let pad = params.pad_units();
    let mut diagnostics = Vec::new();

    let segments = chain.segments_mut();
    let count = segments.len();
    for index in 0..count {
        let limit = if index + 1 < count {
            Some(segments[index + 1].begin)
        } else {
            params.source_len
        };

        let segment = &mut segments[index];
        let duration = segment.duration(params.sample_rate);
        let violation = if duration < params.min_duration {
            Some(BandViolation::TooShort)
        } else if duration > params.max_duration {
            Some(BandViolation::TooLong)
        } else {
            None
        };

        if let Some(violation) = violation {
            warn!(
                "Segment {} ({}..{}) is {}: {:.2}s outside [{:.2}s, {:.2}s]",
                index,
                segment.begin,
                segment.end,
                violation,
                duration,
                params.min_duration,
                params.max_duration
            );
            diagnostics.push(OutOfBand {
                index,
                duration,
                violation,
            });
        }

        let padded = segment.end.saturating_add(pad);
        segment.end = match limit {
            Some(limit) => padded.min(limit.max(segment.end)),
            None => padded,
        };
    }

    debug!(
        "Padded {} segments by {} units, {} out of band",
        count,
        pad,
        diagnostics.len()
    );

    PaddedChain { chain, diagnostics }
}
