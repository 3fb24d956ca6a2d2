use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::error::{Result, SegmentError};
use crate::segment::Segment;

use super::Waveform;

/// Read a WAV file as mono samples in `[-1, 1]`.
///
/// Multi-channel files are averaged down to one channel. No resampling is done.
pub fn read_waveform(path: &Path) -> Result<Waveform> {
    if !path.exists() {
        return Err(SegmentError::FileNotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path)
        .map_err(|e| SegmentError::AudioRead(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    info!(
        "Reading {}: {} Hz, {} channels, {} bits",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>(),
    }
    .map_err(|e| SegmentError::AudioRead(format!("Failed to decode {}: {e}", path.display())))?;

    let samples = downmix(&interleaved, spec.channels);
    debug!("Decoded {} mono samples", samples.len());

    Ok(Waveform::new(samples, spec.sample_rate))
}

fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Samples covered by a segment, clamped to the waveform.
pub fn slice_segment<'a>(waveform: &'a Waveform, segment: &Segment) -> &'a [f32] {
    let len = waveform.samples.len();
    let begin = (segment.begin as usize).min(len);
    let end = (segment.end as usize).clamp(begin, len);
    &waveform.samples[begin..end]
}

/// Write samples as a 16-bit mono PCM WAV file.
pub fn write_clip(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| {
        SegmentError::AudioWrite(format!("Failed to create {}: {e}", path.display()))
    })?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).map_err(|e| {
            SegmentError::AudioWrite(format!("Failed to write {}: {e}", path.display()))
        })?;
    }

    writer.finalize().map_err(|e| {
        SegmentError::AudioWrite(format!("Failed to finalize {}: {e}", path.display()))
    })?;

    debug!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}
