//! End-to-end silence removal: profile, detect, assemble.
//!
//! Phases run strictly in sequence and each hands an immutable result to the
//! next. Any failure aborts the run without writing to the output path.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use vcut_models::{Interval, LoudnessProfile};

use super::apply::{assemble_clips, AssembledVideo, MediaToolkit, VideoHandle, WriteError};
use super::config::{ConfigError, SilenceRemovalConfig};
use super::detector::{detect_intervals, DetectedIntervals, SegmentStats};
use super::profiler::profile_loudness;
use super::source::AudioReadError;

/// Phase-level failure of a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Audio read error: {0}")]
    AudioRead(#[from] AudioReadError),

    #[error("No content remaining: the whole {duration:.3}s video is silence")]
    NoContentRemaining { duration: f64 },

    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

impl PipelineError {
    /// Name of the phase that failed.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::AudioRead(_) => "audio analysis",
            Self::NoContentRemaining { .. } => "silence detection",
            Self::Write(_) => "output",
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::AudioRead(_) => 3,
            Self::NoContentRemaining { .. } => 4,
            Self::Write(_) => 5,
        }
    }
}

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Outcome of the profile and detect phases.
#[derive(Debug, Clone)]
pub struct SilenceAnalysis {
    pub video: VideoHandle,
    pub threshold_db: f64,
    pub min_silence_length: f64,
    pub profile_len: usize,
    pub intervals: DetectedIntervals,
}

/// Serializable summary of an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub input: PathBuf,
    pub threshold_db: f64,
    pub min_silence_length: f64,
    pub total_duration: f64,
    pub loudness_samples: usize,
    pub silence: Vec<Interval>,
    pub keep: Vec<Interval>,
    pub stats: SegmentStats,
}

impl SilenceAnalysis {
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            input: self.video.path.clone(),
            threshold_db: self.threshold_db,
            min_silence_length: self.min_silence_length,
            total_duration: self.intervals.total_duration,
            loudness_samples: self.profile_len,
            silence: self.intervals.silence.clone(),
            keep: self.intervals.keep.clone(),
            stats: self.intervals.stats(),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub analysis: SilenceAnalysis,
    pub output: AssembledVideo,
}

/// Load `input`, profile its audio and detect silence.
pub async fn analyze_video<T: MediaToolkit + ?Sized>(
    toolkit: &T,
    input: &Path,
    config: &SilenceRemovalConfig,
) -> PipelineResult<SilenceAnalysis> {
    config.validate()?;

    let video = toolkit.load_video(input).await?;
    let mut source = toolkit.open_audio(&video, config.sample_rate)?;

    info!(
        input = %input.display(),
        duration = video.duration,
        "Profiling audio"
    );

    let started = Instant::now();
    let profiler_config = config.clone();
    let profile: LoudnessProfile =
        tokio::task::spawn_blocking(move || profile_loudness(&mut source, &profiler_config))
            .await
            .map_err(|e| AudioReadError::Interrupted(e.to_string()))??;

    debug!(
        samples = profile.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Audio profiled"
    );

    let threshold_db = config.effective_threshold_db();
    let intervals = detect_intervals(
        &profile,
        video.duration,
        threshold_db,
        config.min_silence_length,
    );

    info!(
        silence_intervals = intervals.silence.len(),
        silence_secs = format!("{:.3}", intervals.silence_duration()),
        keep_intervals = intervals.keep.len(),
        keep_secs = format!("{:.3}", intervals.keep_duration()),
        threshold_db,
        "Silence detected"
    );

    Ok(SilenceAnalysis {
        video,
        threshold_db,
        min_silence_length: config.min_silence_length,
        profile_len: profile.len(),
        intervals,
    })
}

/// Remove silence from `input` and write the result to `output`.
pub async fn remove_silence<T: MediaToolkit + ?Sized>(
    toolkit: &T,
    input: &Path,
    output: &Path,
    config: &SilenceRemovalConfig,
) -> PipelineResult<RemovalOutcome> {
    let analysis = analyze_video(toolkit, input, config).await?;

    if analysis.intervals.is_all_silence() {
        warn!(
            input = %input.display(),
            "Entire video is silence, nothing to write"
        );
        return Err(PipelineError::NoContentRemaining {
            duration: analysis.intervals.total_duration,
        });
    }

    let started = Instant::now();
    let written = assemble_clips(toolkit, &analysis.video, &analysis.intervals.keep, output).await?;

    info!(
        output = %written.path.display(),
        clips = written.clip_count,
        duration = format!("{:.3}", written.duration),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Silence removal complete"
    );

    Ok(RemovalOutcome {
        analysis,
        output: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            PipelineError::Config(ConfigError::Missing("input_path")),
            PipelineError::AudioRead(AudioReadError::NoAudioData),
            PipelineError::NoContentRemaining { duration: 3.0 },
            PipelineError::Write(WriteError::NothingToWrite),
        ];
        let codes: Vec<_> = errors.iter().map(|e| e.exit_code()).collect();
        assert_eq!(codes, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_message_names_phase() {
        let err = PipelineError::NoContentRemaining { duration: 3.0 };
        assert_eq!(err.phase(), "silence detection");
        assert!(err.to_string().contains("3.000s"));

        let err: PipelineError = ConfigError::invalid("chunk_size", "must be positive").into();
        assert_eq!(err.phase(), "configuration");
        assert!(err.to_string().contains("chunk_size"));
    }
}
