//! Run configuration.
//!
//! Settings are layered in increasing precedence: `config.json`, then
//! `VCUT_*` environment variables, then command-line flags. Every layer is a
//! [`ConfigOverrides`]; [`RunConfig::resolve`] merges them over the defaults
//! and validates the result.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use vcut_media::silence_removal::{ConfigError, SilenceRemovalConfig, ThresholdScale};
use vcut_models::EncodingConfig;

use crate::cli::Args;

pub const ENV_INPUT_PATH: &str = "VCUT_INPUT_PATH";
pub const ENV_OUTPUT_PATH: &str = "VCUT_OUTPUT_PATH";
pub const ENV_SILENCE_THRESHOLD: &str = "VCUT_SILENCE_THRESHOLD";
pub const ENV_MIN_SILENCE_LENGTH: &str = "VCUT_MIN_SILENCE_LENGTH";
pub const ENV_CHUNK_SIZE: &str = "VCUT_CHUNK_SIZE";

/// One layer of optional settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub silence_threshold: Option<f64>,
    pub threshold_scale: Option<ThresholdScale>,
    pub reference_db: Option<f64>,
    pub min_silence_length: Option<f64>,
    pub chunk_size: Option<f64>,
    pub sample_rate: Option<u32>,
    pub encoding: Option<EncodingConfig>,
}

impl ConfigOverrides {
    /// Read a JSON config file.
    ///
    /// A missing file yields an empty layer unless `required` is set.
    pub fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the `VCUT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            input_path: value(ENV_INPUT_PATH).map(PathBuf::from),
            output_path: value(ENV_OUTPUT_PATH).map(PathBuf::from),
            silence_threshold: parse_var(ENV_SILENCE_THRESHOLD, value(ENV_SILENCE_THRESHOLD))?,
            min_silence_length: parse_var(ENV_MIN_SILENCE_LENGTH, value(ENV_MIN_SILENCE_LENGTH))?,
            chunk_size: parse_var(ENV_CHUNK_SIZE, value(ENV_CHUNK_SIZE))?,
            ..Default::default()
        })
    }

    /// Settings given as command-line flags.
    pub fn from_args(args: &Args) -> Self {
        Self {
            input_path: args.input.clone(),
            output_path: args.output.clone(),
            silence_threshold: args.threshold,
            threshold_scale: args.threshold_scale,
            min_silence_length: args.min_silence_length,
            chunk_size: args.chunk_size,
            ..Default::default()
        }
    }

    /// Layer `over` on top of `self`; values set in `over` win.
    pub fn merge(self, over: Self) -> Self {
        Self {
            input_path: over.input_path.or(self.input_path),
            output_path: over.output_path.or(self.output_path),
            silence_threshold: over.silence_threshold.or(self.silence_threshold),
            threshold_scale: over.threshold_scale.or(self.threshold_scale),
            reference_db: over.reference_db.or(self.reference_db),
            min_silence_length: over.min_silence_length.or(self.min_silence_length),
            chunk_size: over.chunk_size.or(self.chunk_size),
            sample_rate: over.sample_rate.or(self.sample_rate),
            encoding: over.encoding.or(self.encoding),
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|v| {
        v.trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", v)))
    })
    .transpose()
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub removal: SilenceRemovalConfig,
    pub encoding: EncodingConfig,
}

impl RunConfig {
    /// Merge `layers` (lowest precedence first) over the defaults.
    ///
    /// Checks that the input is an existing file and that the output path,
    /// if it exists, is a directory. The output directory itself is not
    /// created here.
    pub fn resolve<I>(layers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ConfigOverrides>,
    {
        let merged = layers
            .into_iter()
            .fold(ConfigOverrides::default(), ConfigOverrides::merge);

        let defaults = SilenceRemovalConfig::default();
        let removal = SilenceRemovalConfig {
            silence_threshold: merged.silence_threshold.unwrap_or(defaults.silence_threshold),
            threshold_scale: merged.threshold_scale.unwrap_or(defaults.threshold_scale),
            reference_db: merged.reference_db.unwrap_or(defaults.reference_db),
            min_silence_length: merged.min_silence_length.unwrap_or(defaults.min_silence_length),
            chunk_size: merged.chunk_size.unwrap_or(defaults.chunk_size),
            sample_rate: merged.sample_rate.unwrap_or(defaults.sample_rate),
        };
        removal.validate()?;

        let input_path = merged.input_path.ok_or(ConfigError::Missing("input_path"))?;
        if !input_path.exists() {
            return Err(ConfigError::InputNotFound(input_path));
        }
        if !input_path.is_file() {
            return Err(ConfigError::InputNotAFile(input_path));
        }

        let output_dir = merged
            .output_path
            .unwrap_or_else(|| default_output_dir(&input_path));
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(ConfigError::OutputNotADirectory(output_dir));
        }

        Ok(Self {
            input_path,
            output_dir,
            removal,
            encoding: merged.encoding.unwrap_or_default(),
        })
    }

    /// Resolve from the config file, the environment and `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let (path, required) = args.config_file();
        let file = ConfigOverrides::from_file(&path, required)?;
        let env = ConfigOverrides::from_env()?;
        let flags = ConfigOverrides::from_args(args);

        let config = Self::resolve([file, env, flags])?;
        debug!(?config, "Resolved configuration");
        Ok(config)
    }
}

/// Directory containing `input`, or the working directory for a bare name.
fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
