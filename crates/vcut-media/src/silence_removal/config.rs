//! Configuration for silence removal.
//!
//! These parameters control how loudness is measured and how aggressively
//! silence is cut.
//!
//! # Level convention
//!
//! Loudness levels are RMS levels in dB relative to `reference_db`, where
//! 0 dB with `reference_db = 0.0` is a full-scale signal (dBFS). Silence sits
//! far below zero, so a threshold such as -50 dB is typical.
//!
//! `silence_threshold` is read through [`ThresholdScale`]. The default
//! `Legacy` scale accepts the small positive numbers older config files use:
//! a positive `t` means `-(t * 100)` dB, so `0.5` becomes -50 dB.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default silence threshold (legacy scale, i.e. -50 dBFS).
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 0.5;
/// Default minimum silence length in seconds.
pub const DEFAULT_MIN_SILENCE_LENGTH: f64 = 0.5;
/// Default loudness window in seconds.
pub const DEFAULT_CHUNK_SIZE: f64 = 0.01;
/// Default analysis sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Input path is not a file: {0}")]
    InputNotAFile(PathBuf),

    #[error("Output path is not a directory: {0}")]
    OutputNotADirectory(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// How `silence_threshold` maps onto the dB scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdScale {
    /// Positive values are scaled to `-(t * 100)` dB, others used as-is.
    #[default]
    Legacy,
    /// The value is a dB level relative to the reference.
    Dbfs,
}

impl std::str::FromStr for ThresholdScale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "dbfs" | "db" => Ok(Self::Dbfs),
            other => Err(ConfigError::invalid(
                "threshold_scale",
                format!("expected 'legacy' or 'dbfs', got '{}'", other),
            )),
        }
    }
}

/// Detection settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceRemovalConfig {
    /// Silence threshold, interpreted through `threshold_scale`.
    ///
    /// A loudness sample at or below the effective threshold is silent.
    pub silence_threshold: f64,

    /// Interpretation of `silence_threshold`.
    pub threshold_scale: ThresholdScale,

    /// Level (in dBFS) that reads as 0 dB.
    pub reference_db: f64,

    /// Minimum silence duration before it is cut (seconds).
    ///
    /// A run of exactly this length is cut.
    pub min_silence_length: f64,

    /// Loudness window in seconds; one loudness sample per window.
    pub chunk_size: f64,

    /// Sample rate audio is decoded at for analysis (Hz).
    pub sample_rate: u32,
}

impl Default for SilenceRemovalConfig {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            threshold_scale: ThresholdScale::Legacy,
            reference_db: 0.0,
            min_silence_length: DEFAULT_MIN_SILENCE_LENGTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SilenceRemovalConfig {
    /// Threshold in dB that loudness levels are compared against.
    pub fn effective_threshold_db(&self) -> f64 {
        match self.threshold_scale {
            ThresholdScale::Legacy if self.silence_threshold > 0.0 => {
                -(self.silence_threshold * 100.0)
            }
            _ => self.silence_threshold,
        }
    }

    /// Loudness window length in samples at `sample_rate` (at least one).
    pub fn chunk_samples(&self, sample_rate: u32) -> usize {
        ((self.chunk_size * sample_rate as f64).round() as usize).max(1)
    }

    /// Check numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.silence_threshold.is_finite() {
            return Err(ConfigError::invalid("silence_threshold", "must be a finite number"));
        }
        if !self.reference_db.is_finite() {
            return Err(ConfigError::invalid("reference_db", "must be a finite number"));
        }
        if !self.min_silence_length.is_finite() || self.min_silence_length < 0.0 {
            return Err(ConfigError::invalid(
                "min_silence_length",
                format!("must be a non-negative number of seconds, got {}", self.min_silence_length),
            ));
        }
        if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            return Err(ConfigError::invalid(
                "chunk_size",
                format!("must be a positive number of seconds, got {}", self.chunk_size),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be greater than zero"));
        }
        Ok(())
    }

    /// Builder-style setter for the threshold, switching to the dBFS scale.
    pub fn with_threshold_db(mut self, threshold_db: f64) -> Self {
        self.silence_threshold = threshold_db;
        self.threshold_scale = ThresholdScale::Dbfs;
        self
    }

    /// Builder-style setter for minimum silence length.
    pub fn with_min_silence_length(mut self, seconds: f64) -> Self {
        self.min_silence_length = seconds;
        self
    }

    /// Builder-style setter for the loudness window.
    pub fn with_chunk_size(mut self, seconds: f64) -> Self {
        self.chunk_size = seconds;
        self
    }

    /// Builder-style setter for the analysis sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}
