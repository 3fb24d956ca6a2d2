use crate::error::{Result, SegmentError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Segmentation thresholds and batch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shortest acceptable clip, in seconds.
    pub min_duration: f64,
    /// Longest acceptable clip, in seconds. Merges never exceed it.
    pub max_duration: f64,
    /// Silence threshold in dB relative to the loudest frame (<= 0).
    pub silence_threshold_db: f64,
    /// Largest silence gap a merge may bridge, in seconds.
    pub max_gap_duration: f64,
    /// Sample rate used to convert interval offsets to seconds.
    pub sample_rate: u32,
    /// Extension applied to every clip end after merging, in seconds.
    pub trailing_pad: f64,
    /// Number of files segmented in parallel by the batch driver.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_duration: 15.0,
            max_duration: 30.0,
            silence_threshold_db: -32.0,
            max_gap_duration: 5.0,
            sample_rate: 22050,
            trailing_pad: 0.2,
            concurrency: 4,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Ignoring malformed {}: {}", config_path.display(), e),
                }
            }
        }

        // Override with environment variables
        override_from_env("AUTOSEG_MIN_DURATION", &mut config.min_duration);
        override_from_env("AUTOSEG_MAX_DURATION", &mut config.max_duration);
        override_from_env("AUTOSEG_THRESHOLD_DB", &mut config.silence_threshold_db);
        override_from_env("AUTOSEG_MAX_GAP", &mut config.max_gap_duration);
        override_from_env("AUTOSEG_SAMPLE_RATE", &mut config.sample_rate);
        override_from_env("AUTOSEG_TRAILING_PAD", &mut config.trailing_pad);
        override_from_env("AUTOSEG_CONCURRENCY", &mut config.concurrency);

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.min_duration,
            self.max_duration,
            self.silence_threshold_db,
            self.max_gap_duration,
            self.trailing_pad,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(SegmentError::Config(
                "Durations and thresholds must be finite numbers".to_string(),
            ));
        }

        if self.min_duration <= 0.0 {
            return Err(SegmentError::Config(format!(
                "min_duration must be greater than 0 (got {})",
                self.min_duration
            )));
        }
        if self.max_duration <= 0.0 || self.min_duration >= self.max_duration {
            return Err(SegmentError::Config(format!(
                "max_duration must be greater than min_duration (got {} <= {})",
                self.max_duration, self.min_duration
            )));
        }
        if self.silence_threshold_db > 0.0 {
            return Err(SegmentError::Config(format!(
                "silence_threshold_db is measured below peak and must be <= 0 (got {})",
                self.silence_threshold_db
            )));
        }
        if self.max_gap_duration < 0.0 {
            return Err(SegmentError::Config(format!(
                "max_gap_duration must not be negative (got {})",
                self.max_gap_duration
            )));
        }
        if self.sample_rate == 0 {
            return Err(SegmentError::Config(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if self.trailing_pad < 0.0 {
            return Err(SegmentError::Config(format!(
                "trailing_pad must not be negative (got {})",
                self.trailing_pad
            )));
        }
        if self.concurrency == 0 {
            return Err(SegmentError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("autoseg").join("config.toml"))
    }
}

fn override_from_env<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring {}={:?}: not a valid value", name, raw),
        }
    }
}
