//! Loudness-based silence removal.
//!
//! Finds the spans where the audio stays at or below a loudness threshold for
//! long enough, and writes a video made of everything else.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Audio Source │───►│ Profiler     │───►│ Detector     │
//! │ (16kHz mono) │    │ (RMS dB/chunk│    │ (silence/keep│
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                                                │
//!                                                ▼
//!                     ┌──────────────┐    ┌──────────────┐
//!                     │ Output Video │◄───│ Assembler    │
//!                     │ (cuts applied│    │ (clip+concat)│
//!                     └──────────────┘    └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use vcut_media::silence_removal::{remove_silence, FfmpegToolkit, SilenceRemovalConfig};
//!
//! let config = SilenceRemovalConfig::default();
//! let toolkit = FfmpegToolkit::new(EncodingConfig::default(), &output_dir)?;
//! let outcome = remove_silence(&toolkit, &input_path, &output_path, &config).await?;
//! ```

mod apply;
mod config;
mod detector;
mod pipeline;
mod profiler;
mod source;

pub use apply::{
    assemble_clips, AssembledVideo, ClipHandle, FfmpegToolkit, MediaToolkit, VideoHandle,
    WriteError,
};
pub use config::{
    ConfigError, SilenceRemovalConfig, ThresholdScale, DEFAULT_CHUNK_SIZE,
    DEFAULT_MIN_SILENCE_LENGTH, DEFAULT_SAMPLE_RATE, DEFAULT_SILENCE_THRESHOLD,
};
pub use detector::{
    compute_segment_stats, detect_intervals, keep_intervals, DetectedIntervals, Segment,
    SegmentLabel, SegmentStats, SilenceDetector,
};
pub use pipeline::{
    analyze_video, remove_silence, AnalysisReport, PipelineError, PipelineResult,
    RemovalOutcome, SilenceAnalysis,
};
pub use profiler::{level_db, profile_loudness, AudioChunks, SILENCE_FLOOR_DB};
pub use source::{AudioReadError, AudioResult, AudioSource, FfmpegAudioSource, MemoryAudioSource};
