#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and silence removal engine.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Video probing, sub-clip extraction and concat
//! - Loudness profiling and silence detection over streamed audio

pub mod clip;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod silence_removal;

pub use clip::{concat_segments, extract_segment};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, AudioStreamInfo, VideoInfo};
pub use progress::FfmpegProgress;
pub use silence_removal::{
    analyze_video, remove_silence, FfmpegToolkit, MediaToolkit, PipelineError,
    SilenceRemovalConfig,
};
