//! Energy-based silence splitting of a mono waveform.

use tracing::{debug, info};

use crate::error::Result;
use crate::segment::{import_intervals, SegmentChain};

use super::Waveform;

/// Analysis window length in samples.
pub const FRAME_LENGTH: usize = 1024;

/// Hop between analysis windows in samples.
pub const HOP_LENGTH: usize = 256;

/// Energy floor; anything at or below it is treated as digital silence.
const AMIN: f64 = 1e-10;

/// Mean-square energy of each centered analysis frame.
///
/// Frame `i` is centered on sample `i * hop`; samples outside the signal count
/// as zero, so there are `1 + len / hop` frames.
fn compute_energy_profile(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let half = frame_length / 2;
    let frame_count = 1 + samples.len() / hop_length;

    (0..frame_count)
        .map(|i| {
            let center = i * hop_length;
            let start = center.saturating_sub(half);
            let end = (center + frame_length - half).min(samples.len());
            let sum_squares: f64 = samples[start..end.max(start)]
                .iter()
                .map(|&s| {
                    let s = s as f64;
                    s * s
                })
                .sum();
            sum_squares / frame_length as f64
        })
        .collect()
}

/// Classify frames as non-silent (true) when louder than `threshold_db`
/// relative to the loudest frame.
fn detect_voiced_frames(energy_values: &[f64], threshold_db: f64) -> Vec<bool> {
    let peak = energy_values.iter().copied().fold(0.0_f64, f64::max);
    if peak <= AMIN {
        return vec![false; energy_values.len()];
    }

    let reference_db = 10.0 * peak.log10();
    energy_values
        .iter()
        .map(|&e| 10.0 * e.max(AMIN).log10() - reference_db > threshold_db)
        .collect()
}

/// Convert runs of voiced frames to sample spans clamped to the signal length.
fn frames_to_spans(voiced: &[bool], hop_length: usize, total_samples: usize) -> Vec<(u64, u64)> {
    let mut spans = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &is_voiced) in voiced.iter().enumerate() {
        match (is_voiced, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                spans.push((start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        spans.push((start, voiced.len()));
    }

    spans
        .into_iter()
        .map(|(start, end)| {
            let begin = (start * hop_length).min(total_samples) as u64;
            let end = (end * hop_length).min(total_samples) as u64;
            (begin, end)
        })
        .filter(|(begin, end)| begin < end)
        .collect()
}

/// Split a waveform into maximal non-silent spans.
///
/// `threshold_db` is measured relative to the loudest frame, e.g. `-32.0`.
/// Returns an empty list for empty or digitally silent input.
pub fn split_on_silence(samples: &[f32], threshold_db: f64) -> Vec<(u64, u64)> {
    let energy_values = compute_energy_profile(samples, FRAME_LENGTH, HOP_LENGTH);
    let voiced = detect_voiced_frames(&energy_values, threshold_db);
    let spans = frames_to_spans(&voiced, HOP_LENGTH, samples.len());

    debug!(
        "{} frames analysed, {} voiced, {} spans",
        voiced.len(),
        voiced.iter().filter(|&&v| v).count(),
        spans.len()
    );

    spans
}

/// Build the initial segment chain of a waveform from its non-silent spans.
///
/// An entirely silent waveform yields an empty chain.
pub fn silence_split(waveform: &Waveform, threshold_db: f64) -> Result<SegmentChain> {
    let spans = split_on_silence(&waveform.samples, threshold_db);
    info!(
        "Split {:.1}s of audio into {} non-silent spans",
        waveform.duration().as_secs_f64(),
        spans.len()
    );

    if spans.is_empty() {
        return Ok(SegmentChain::new());
    }
    import_intervals(spans)
}
