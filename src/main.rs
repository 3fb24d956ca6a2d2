use anyhow::{Context, Result};
use autoseg::config::Config;
use autoseg::pipeline::{
    cut_from_report, list_wav_files, print_summary, run_batch, BatchOptions,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "autoseg")]
#[command(version, about = "Split long speech recordings into silence-delimited clips")]
#[command(long_about = "Split long speech recordings into bounded-duration clips that start and end on silence, for transcription and TTS datasets.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Segment every WAV file in a directory
    Split(SplitArgs),
    /// Cut a WAV file along a diarization JSON report
    Import {
        /// Source WAV file
        wav: PathBuf,
        /// Diarization report (JSON)
        report: PathBuf,
        /// Output directory for clips
        #[arg(short, long, default_value = "result")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct SplitArgs {
    /// Directory with input WAV files
    input_dir: PathBuf,

    /// Output directory (defaults to <input_dir>/wavs)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum clip duration in seconds
    #[arg(long)]
    min: Option<f64>,

    /// Maximum clip duration in seconds
    #[arg(long)]
    max: Option<f64>,

    /// Silence threshold in dB below peak (e.g. -32)
    #[arg(long, allow_hyphen_values = true)]
    threshold_db: Option<f64>,

    /// Largest silence gap a merge may bridge, in seconds
    #[arg(long)]
    max_gap: Option<f64>,

    /// Trailing pad added to each clip, in seconds
    #[arg(long)]
    pad: Option<f64>,

    /// Number of files processed in parallel
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Clip id prefix (defaults to each file name)
    #[arg(long)]
    prefix: Option<String>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl SplitArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.min {
            config.min_duration = v;
        }
        if let Some(v) = self.max {
            config.max_duration = v;
        }
        if let Some(v) = self.threshold_db {
            config.silence_threshold_db = v;
        }
        if let Some(v) = self.max_gap {
            config.max_gap_duration = v;
        }
        if let Some(v) = self.pad {
            config.trailing_pad = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            prefix: self.prefix.clone(),
            show_progress: !self.no_progress,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Split(args) => {
            let mut config = Config::load().context("Failed to load configuration")?;
            args.apply(&mut config);
            config
                .validate()
                .context("Configuration validation failed")?;

            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.input_dir.join("wavs"));
            let inputs = list_wav_files(&args.input_dir)
                .with_context(|| format!("Failed to list {}", args.input_dir.display()))?;
            if inputs.is_empty() {
                anyhow::bail!("No WAV files found in {}", args.input_dir.display());
            }

            info!("Input:    {}", args.input_dir.display());
            info!("Output:   {}", output.display());
            info!(
                "Clips:    {:.1}s..{:.1}s, gap <= {:.2}s, threshold {} dB",
                config.min_duration,
                config.max_duration,
                config.max_gap_duration,
                config.silence_threshold_db
            );

            let stats = run_batch(inputs, &output, &config, &args.batch_options())
                .await
                .context("Segmentation failed")?;
            print_summary(&stats);
        }
        Command::Import {
            wav,
            report,
            output,
        } => {
            let entries = cut_from_report(&wav, &report, &output)
                .with_context(|| format!("Failed to cut {}", wav.display()))?;
            info!("Wrote {} clips to {}", entries.len(), output.display());
        }
    }

    Ok(())
}
