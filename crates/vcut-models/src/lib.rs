//! Shared data models for vcut.
//!
//! This crate provides Serde-serializable types for:
//! - Time intervals on the source timeline
//! - Loudness samples and audio chunks produced while profiling
//! - Encoding configuration for re-encoded sub-clips
//! - Timestamp formatting for logs and reports

pub mod audio;
pub mod encoding;
pub mod interval;
pub mod timestamp;

// Re-export common types
pub use audio::{AudioChunk, LoudnessProfile, LoudnessSample};
pub use encoding::EncodingConfig;
pub use interval::{total_duration, Interval, IntervalError};
pub use timestamp::format_seconds;
