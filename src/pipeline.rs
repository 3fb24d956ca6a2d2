use crate::audio::{read_waveform, silence_split, slice_segment, write_clip, Waveform};
use crate::config::Config;
use crate::error::{Result, SegmentError};
use crate::manifest::{entries_for_chain, metadata_line, write_manifest, ManifestEntry};
use crate::segment::{
    import_intervals, optimize, pad_and_validate, DiarizationReport, Interval, MergeParams,
    OutOfBand, PadParams, SegmentChain,
};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Final clip boundaries of one source plus its advisory diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    pub chain: SegmentChain,
    pub diagnostics: Vec<OutOfBand>,
    pub sample_rate: u32,
}

impl SegmentationResult {
    /// Sum of clip durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.chain.total_len() as f64 / self.sample_rate as f64
    }
}

/// Split a waveform on silence, merge the spans and pad the result.
pub fn segment_waveform(waveform: &Waveform, config: &Config) -> Result<SegmentationResult> {
    config.validate()?;
    let sample_rate = waveform.sample_rate;

    let chain = silence_split(waveform, config.silence_threshold_db)?;
    let initial = chain.len();
    let merged = optimize(chain, &MergeParams::from_config(config, sample_rate))?;
    let padded = pad_and_validate(
        merged,
        &PadParams::from_config(config, sample_rate, Some(waveform.len() as u64)),
    );

    debug!(
        "Segmented waveform: {} spans merged into {} clips",
        initial,
        padded.chain.len()
    );

    Ok(SegmentationResult {
        chain: padded.chain,
        diagnostics: padded.diagnostics,
        sample_rate,
    })
}

/// Import intervals (in units of `config.sample_rate`), merge and pad them.
pub fn segment_intervals(
    intervals: Vec<Interval>,
    config: &Config,
    source_len: Option<u64>,
) -> Result<SegmentationResult> {
    config.validate()?;
    let sample_rate = config.sample_rate;

    let chain = import_intervals(intervals)?;
    let merged = optimize(chain, &MergeParams::from_config(config, sample_rate))?;
    let padded = pad_and_validate(
        merged,
        &PadParams::from_config(config, sample_rate, source_len),
    );

    Ok(SegmentationResult {
        chain: padded.chain,
        diagnostics: padded.diagnostics,
        sample_rate,
    })
}

/// Name every clip `{prefix}-{nnnn}` in chain order.
pub fn assign_ids(chain: &mut SegmentChain, prefix: &str) {
    for (j, segment) in chain.segments_mut().iter_mut().enumerate() {
        segment.id = Some(format!("{}-{:04}", prefix, j));
    }
}

/// Outcome of segmenting one source file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub entries: Vec<ManifestEntry>,
    /// Written clip durations in seconds.
    pub clip_durations: Vec<f64>,
    pub out_of_band: usize,
    pub audio_duration: Duration,
}

/// Running totals across a batch of files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub segments: usize,
    /// Sum of clip durations in seconds.
    pub total_duration: f64,
    /// Longest clip written, in seconds.
    pub max_clip_duration: f64,
    pub out_of_band: usize,
    pub audio_duration: Duration,
    pub total_time: Duration,
}

impl BatchStats {
    pub fn record(&mut self, report: &FileReport) {
        self.files_processed += 1;
        self.segments += report.entries.len();
        self.total_duration += report.clip_durations.iter().sum::<f64>();
        self.max_clip_duration = report
            .clip_durations
            .iter()
            .copied()
            .fold(self.max_clip_duration, f64::max);
        self.out_of_band += report.out_of_band;
        self.audio_duration += report.audio_duration;
    }

    pub fn record_failure(&mut self) {
        self.files_failed += 1;
    }

    pub fn mean_clip_duration(&self) -> f64 {
        if self.segments == 0 {
            0.0
        } else {
            self.total_duration / self.segments as f64
        }
    }
}

/// WAV files in a directory, in alphabetical order.
pub fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SegmentError::FileNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string())
}

/// Clip id prefix for every input of a batch.
///
/// The prefix is `prefix` when given, else the file stem. Prefixes that collide
/// (ignoring case, since clips share one output directory) get a `-2`, `-3`, ...
/// suffix in input order.
pub fn clip_prefixes(inputs: &[PathBuf], prefix: Option<&str>) -> Vec<String> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = prefix.map_or_else(|| file_stem(input), str::to_string);
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = format!("{}-{}", base, n);
                n += 1;
            }
            if candidate != base {
                warn!(
                    "Clip prefix {} already used, naming clips of {} as {}",
                    base,
                    input.display(),
                    candidate
                );
            }
            candidate
        })
        .collect()
}

/// Segment one WAV file and write its clips as `{prefix}-{nnnn}.wav` into `output_dir`.
pub fn process_file(
    input: &Path,
    output_dir: &Path,
    config: &Config,
    prefix: &str,
) -> Result<FileReport> {
    let waveform = read_waveform(input)?;
    let audio_duration = waveform.duration();
    info!(
        " -> Loaded {:.1} min of audio. Splitting...",
        audio_duration.as_secs_f64() / 60.0
    );

    let mut result = segment_waveform(&waveform, config)?;
    if result.chain.is_empty() {
        return Err(SegmentError::EmptyInput(format!(
            "{} contains no audio above {} dB",
            input.display(),
            config.silence_threshold_db
        )));
    }

    assign_ids(&mut result.chain, prefix);
    let source = input.display().to_string();
    let entries = entries_for_chain(&result.chain, &source);

    let mut clip_durations = Vec::with_capacity(entries.len());
    for (segment, entry) in result.chain.iter().zip(&entries) {
        let samples = slice_segment(&waveform, segment);
        write_clip(
            &output_dir.join(format!("{}.wav", entry.id)),
            samples,
            waveform.sample_rate,
        )?;
        clip_durations.push(samples.len() as f64 / waveform.sample_rate as f64);
    }

    let total: f64 = clip_durations.iter().sum();
    info!(
        " -> Segmented into {} parts ({:.1} min, {:.2} sec avg)",
        entries.len(),
        total / 60.0,
        total / entries.len() as f64
    );

    Ok(FileReport {
        source: input.to_path_buf(),
        entries,
        clip_durations,
        out_of_band: result.diagnostics.len(),
        audio_duration,
    })
}

/// Knobs of a batch run that are not segmentation thresholds.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Clip id prefix used instead of each file stem.
    pub prefix: Option<String>,
    pub show_progress: bool,
}

/// Segment many files concurrently and write one `segments.csv` manifest.
///
/// A file that fails is logged and skipped; the batch only fails on setup errors.
/// Clip ids are unique across the batch, see [`clip_prefixes`].
pub async fn run_batch(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
    config: &Config,
    options: &BatchOptions,
) -> Result<BatchStats> {
    config.validate()?;
    fs::create_dir_all(output_dir)?;
    let prefixes = clip_prefixes(&inputs, options.prefix.as_deref());

    let start_time = Instant::now();
    let total_files = inputs.len();
    info!(
        "Segmenting {} files with {} workers into {}",
        total_files,
        config.concurrency,
        output_dir.display()
    );

    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut futures = FuturesUnordered::new();

    for (index, (input, prefix)) in inputs.into_iter().zip(prefixes).enumerate() {
        let sem = semaphore.clone();
        let pb = progress_bar.clone();
        let config = config.clone();
        let output_dir = output_dir.to_path_buf();

        futures.push(async move {
            let result = match sem.acquire().await {
                Ok(_permit) => {
                    info!("Loading {} ({} of {})", input.display(), index + 1, total_files);
                    let task_input = input.clone();
                    tokio::task::spawn_blocking(move || {
                        process_file(&task_input, &output_dir, &config, &prefix)
                    })
                    .await
                    .map_err(|e| SegmentError::Worker(format!("segmentation task failed: {e}")))
                    .and_then(|r| r)
                }
                Err(e) => Err(SegmentError::Worker(format!("worker pool closed: {e}"))),
            };

            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            (index, input, result)
        });
    }

    let mut results = Vec::with_capacity(total_files);
    while let Some(result) = futures.next().await {
        results.push(result);
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Segmentation complete");
    }

    // Keep the manifest in input order regardless of completion order
    results.sort_by_key(|(index, _, _)| *index);

    let mut stats = BatchStats::default();
    let mut manifest = Vec::new();
    for (_, input, result) in results {
        match result {
            Ok(report) => {
                stats.record(&report);
                manifest.extend(report.entries);
                info!(
                    " -> Progress: {} segments, {:.2} hours, {:.2} sec avg",
                    stats.segments,
                    stats.total_duration / 3600.0,
                    stats.mean_clip_duration()
                );
            }
            Err(e) => {
                warn!("Skipping {}: {}", input.display(), e);
                stats.record_failure();
            }
        }
    }

    write_manifest(&output_dir.join("segments.csv"), &manifest)?;
    stats.total_time = start_time.elapsed();

    Ok(stats)
}

/// Cut a WAV file along a diarization report, one clip per fragment.
///
/// Fragments are not merged. Writes `metadata.csv` (`id|label`) next to the clips.
pub fn cut_from_report(
    wav_path: &Path,
    report_path: &Path,
    output_dir: &Path,
) -> Result<Vec<ManifestEntry>> {
    if !report_path.exists() {
        return Err(SegmentError::FileNotFound(report_path.display().to_string()));
    }
    let report = DiarizationReport::from_json(&fs::read_to_string(report_path)?)?;
    let waveform = read_waveform(wav_path)?;
    let chain = report.to_chain(waveform.sample_rate)?;

    fs::create_dir_all(output_dir)?;

    let source = wav_path.display().to_string();
    let entries = entries_for_chain(&chain, &source);
    let mut metadata = String::new();
    for (segment, entry) in chain.iter().zip(&entries) {
        write_clip(
            &output_dir.join(format!("{}.wav", entry.id)),
            slice_segment(&waveform, segment),
            waveform.sample_rate,
        )?;
        metadata.push_str(&metadata_line(
            &entry.id,
            segment.label.as_deref().unwrap_or_default(),
        ));
        metadata.push('\n');
    }
    fs::write(output_dir.join("metadata.csv"), metadata)?;

    info!(
        "Cut {} clips from {} into {}",
        entries.len(),
        wav_path.display(),
        output_dir.display()
    );
    Ok(entries)
}

/// Print a summary of the batch results.
pub fn print_summary(stats: &BatchStats) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Segmentation Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Files:      {} processed, {} skipped", stats.files_processed, stats.files_failed);
    println!("  Segments:   {}", stats.segments);
    println!(
        "  Duration:   {:.2} hours of clips from {:.2} hours of audio",
        stats.total_duration / 3600.0,
        stats.audio_duration.as_secs_f64() / 3600.0
    );
    println!("  Mean clip:  {:.2}s", stats.mean_clip_duration());
    println!("  Max clip:   {:.2}s", stats.max_clip_duration);
    if stats.out_of_band > 0 {
        println!("  Review:     {} clips outside the duration band", stats.out_of_band);
    }
    println!("  Time:       {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
