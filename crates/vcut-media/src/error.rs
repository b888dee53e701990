//! Errors from driving FFmpeg and FFprobe.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// A failed media tool invocation or unusable media file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} was not found in PATH")]
    ToolMissing(&'static str),

    #[error("ffmpeg failed: {message}")]
    Ffmpeg {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe could not read {path}: {stderr}")]
    Ffprobe { path: PathBuf, stderr: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unusable video: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed ffprobe output: {0}")]
    ProbeOutput(#[from] serde_json::Error),
}

impl MediaError {
    pub fn ffmpeg(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::Ffmpeg {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }

    /// True when a required binary is not installed.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_message() {
        let err = MediaError::ffmpeg("exit status: 1", Some("Invalid data".into()), Some(1));
        assert_eq!(err.to_string(), "ffmpeg failed: exit status: 1");
        assert!(!err.is_tool_missing());
    }

    #[test]
    fn test_tool_missing() {
        let err = MediaError::ToolMissing("ffprobe");
        assert!(err.is_tool_missing());
        assert_eq!(err.to_string(), "ffprobe was not found in PATH");
    }
}
