//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use vcut_media::silence_removal::ThresholdScale;

/// Default location of the JSON config file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Remove silent stretches from a video file.
#[derive(Parser, Debug, Clone)]
#[command(name = "vcut", version, about)]
pub struct Args {
    /// JSON config file; a missing default file is ignored.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input video file.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory the output video is written to (defaults to the input's directory).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Silence threshold, read according to --threshold-scale.
    #[arg(short, long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// How the threshold is read: "legacy" (0.5 means -50 dB) or "dbfs".
    #[arg(long, value_name = "SCALE")]
    pub threshold_scale: Option<ThresholdScale>,

    /// Minimum length of a silent stretch to cut, in seconds.
    #[arg(short = 'm', long = "min-silence", value_name = "SECONDS")]
    pub min_silence_length: Option<f64>,

    /// Loudness window in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub chunk_size: Option<f64>,

    /// Write a JSON report of the detected intervals.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Analyze only; do not write a video.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Config file to read and whether it must exist.
    pub fn config_file(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "vcut=info",
            1 => "vcut=debug",
            _ => "vcut=trace",
        }
    }
}
