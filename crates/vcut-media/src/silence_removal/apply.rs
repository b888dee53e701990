//! Assemble the output video from keep intervals.
//!
//! # Strategy
//!
//! Each keep interval is extracted to its own part with accurate seeking and
//! re-encoding, then the parts are joined with the concat demuxer (stream
//! copy) and moved into place:
//!
//! ```text
//! keep[0] ──► seg_0000 ─┐
//! keep[1] ──► seg_0001 ─┼──► joined ──► rename ──► output
//! keep[n] ──► seg_000n ─┘
//! ```
//!
//! All intermediate files live in a scratch directory created inside the
//! output directory. The final step is a rename on the same filesystem, so
//! the output path holds either the complete video or nothing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use vcut_models::{total_duration, EncodingConfig, Interval};

use super::source::{AudioReadError, AudioSource, FfmpegAudioSource};
use crate::clip::{concat_segments, extract_segment};
use crate::command::{check_ffmpeg, check_ffprobe};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;
use crate::probe::probe_video;

/// Errors from writing the output video.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to extract clip {index} {interval}: {source}")]
    Extract {
        index: usize,
        interval: Interval,
        #[source]
        source: MediaError,
    },

    #[error("Failed to concatenate {count} clips: {source}")]
    Concat {
        count: usize,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write output to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("No intervals to keep")]
    NothingToWrite,

    #[error("Keep intervals must be sorted and disjoint: {0}")]
    Unordered(String),
}

/// A loaded source or intermediate video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHandle {
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
    pub has_audio: bool,
}

/// A sub-clip cut from a source video.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipHandle {
    pub path: PathBuf,
    /// Span of the source timeline this clip covers.
    pub source: Interval,
}

/// Media operations the pipeline depends on.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Open a video and read its duration.
    async fn load_video(&self, path: &Path) -> Result<VideoHandle, AudioReadError>;

    /// Blocking accessor over the video's first audio track.
    fn open_audio(
        &self,
        video: &VideoHandle,
        sample_rate: u32,
    ) -> Result<Box<dyn AudioSource + Send>, AudioReadError>;

    /// Cut `[interval.start, interval.end)` out of `video`.
    async fn extract_subclip(
        &self,
        video: &VideoHandle,
        interval: Interval,
        index: usize,
    ) -> MediaResult<ClipHandle>;

    /// Join `clips` in the given order with hard cuts.
    async fn concatenate(&self, clips: &[ClipHandle]) -> MediaResult<VideoHandle>;

    /// Persist `video` at `path`.
    async fn write_video(&self, video: &VideoHandle, path: &Path) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the FFmpeg and FFprobe binaries.
pub struct FfmpegToolkit {
    encoding: EncodingConfig,
    scratch: TempDir,
}

impl FfmpegToolkit {
    /// Create a toolkit whose intermediate files go under `scratch_parent`.
    ///
    /// `scratch_parent` should be the output directory so the final move is
    /// a same-filesystem rename.
    pub fn new(encoding: EncodingConfig, scratch_parent: &Path) -> MediaResult<Self> {
        check_ffmpeg()?;
        check_ffprobe()?;
        let scratch = tempfile::Builder::new()
            .prefix(".vcut-")
            .tempdir_in(scratch_parent)?;

        debug!(scratch = %scratch.path().display(), "Created scratch directory");
        Ok(Self { encoding, scratch })
    }

    fn part_path(&self, index: usize, ext: &str) -> PathBuf {
        self.scratch.path().join(format!("seg_{:04}.{}", index, ext))
    }
}

/// Container extension to use for intermediates derived from `path`.
fn container_ext(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("mp4")
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn load_video(&self, path: &Path) -> Result<VideoHandle, AudioReadError> {
        let info = probe_video(path).await?;
        if !info.has_audio() {
            return Err(AudioReadError::NoAudioTrack(path.to_path_buf()));
        }

        let audio = info.audio.as_ref();
        debug!(
            path = %path.display(),
            duration = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            video_codec = %info.codec,
            audio_codec = audio.map(|a| a.codec.as_str()),
            audio_rate = audio.map(|a| a.sample_rate),
            audio_channels = audio.map(|a| a.channels),
            "Loaded video"
        );

        Ok(VideoHandle {
            path: path.to_path_buf(),
            duration: info.duration,
            has_audio: true,
        })
    }

    fn open_audio(
        &self,
        video: &VideoHandle,
        sample_rate: u32,
    ) -> Result<Box<dyn AudioSource + Send>, AudioReadError> {
        if !video.has_audio {
            return Err(AudioReadError::NoAudioTrack(video.path.clone()));
        }
        Ok(Box::new(FfmpegAudioSource::new(
            &video.path,
            sample_rate,
            video.duration,
        )))
    }

    async fn extract_subclip(
        &self,
        video: &VideoHandle,
        interval: Interval,
        index: usize,
    ) -> MediaResult<ClipHandle> {
        let part = self.part_path(index, container_ext(&video.path));
        extract_segment(
            &video.path,
            &part,
            interval.start,
            interval.duration(),
            &self.encoding,
        )
        .await?;

        Ok(ClipHandle {
            path: part,
            source: interval,
        })
    }

    async fn concatenate(&self, clips: &[ClipHandle]) -> MediaResult<VideoHandle> {
        let first = clips
            .first()
            .ok_or_else(|| MediaError::invalid_video("no clips to concatenate"))?;
        let joined = self
            .scratch
            .path()
            .join(format!("joined.{}", container_ext(&first.path)));
        let list = self.scratch.path().join("concat.txt");

        let parts: Vec<PathBuf> = clips.iter().map(|c| c.path.clone()).collect();
        concat_segments(&parts, &list, &joined).await?;

        Ok(VideoHandle {
            path: joined,
            duration: clips.iter().map(|c| c.source.duration()).sum(),
            has_audio: true,
        })
    }

    async fn write_video(&self, video: &VideoHandle, path: &Path) -> MediaResult<()> {
        move_file(&video.path, path).await
    }
}

/// Summary of a written output.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledVideo {
    pub path: PathBuf,
    pub clip_count: usize,
    /// Expected output duration (sum of keep intervals).
    pub duration: f64,
}

/// Check that `keep` is non-empty, sorted and non-overlapping.
fn check_keep_order(keep: &[Interval]) -> Result<(), WriteError> {
    if keep.is_empty() {
        return Err(WriteError::NothingToWrite);
    }
    for pair in keep.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(WriteError::Unordered(format!(
                "{} is followed by {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

/// Cut every keep interval from `video`, join them in order and write the
/// result to `output`.
pub async fn assemble_clips<T: MediaToolkit + ?Sized>(
    toolkit: &T,
    video: &VideoHandle,
    keep: &[Interval],
    output: &Path,
) -> Result<AssembledVideo, WriteError> {
    check_keep_order(keep)?;

    info!(
        clips = keep.len(),
        output = %output.display(),
        "Assembling output video"
    );

    let mut clips = Vec::with_capacity(keep.len());
    for (index, interval) in keep.iter().enumerate() {
        debug!(index, start = interval.start, end = interval.end, "Extracting clip");
        let clip = toolkit
            .extract_subclip(video, *interval, index)
            .await
            .map_err(|source| WriteError::Extract {
                index,
                interval: *interval,
                source,
            })?;
        clips.push(clip);
    }

    let joined = toolkit
        .concatenate(&clips)
        .await
        .map_err(|source| WriteError::Concat {
            count: clips.len(),
            source,
        })?;

    toolkit
        .write_video(&joined, output)
        .await
        .map_err(|source| WriteError::Persist {
            path: output.to_path_buf(),
            source,
        })?;

    Ok(AssembledVideo {
        path: output.to_path_buf(),
        clip_count: clips.len(),
        duration: total_duration(keep),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silence_removal::source::MemoryAudioSource;
    use std::sync::Mutex;

    /// Records every call and fails on request.
    #[derive(Default)]
    struct RecordingToolkit {
        calls: Mutex<Vec<String>>,
        fail_extract_at: Option<usize>,
        fail_write: bool,
    }

    impl RecordingToolkit {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaToolkit for RecordingToolkit {
        async fn load_video(&self, path: &Path) -> Result<VideoHandle, AudioReadError> {
            Ok(VideoHandle {
                path: path.to_path_buf(),
                duration: 10.0,
                has_audio: true,
            })
        }

        fn open_audio(
            &self,
            _video: &VideoHandle,
            sample_rate: u32,
        ) -> Result<Box<dyn AudioSource + Send>, AudioReadError> {
            Ok(Box::new(MemoryAudioSource::new(vec![0.5; 10], sample_rate)))
        }

        async fn extract_subclip(
            &self,
            _video: &VideoHandle,
            interval: Interval,
            index: usize,
        ) -> MediaResult<ClipHandle> {
            if self.fail_extract_at == Some(index) {
                return Err(MediaError::ffmpeg("encode failed", None, Some(1)));
            }
            self.calls.lock().unwrap().push(format!("extract {}", interval));
            Ok(ClipHandle {
                path: PathBuf::from(format!("seg_{}.mp4", index)),
                source: interval,
            })
        }

        async fn concatenate(&self, clips: &[ClipHandle]) -> MediaResult<VideoHandle> {
            self.calls.lock().unwrap().push(format!("concat {}", clips.len()));
            Ok(VideoHandle {
                path: PathBuf::from("joined.mp4"),
                duration: clips.iter().map(|c| c.source.duration()).sum(),
                has_audio: true,
            })
        }

        async fn write_video(&self, video: &VideoHandle, path: &Path) -> MediaResult<()> {
            if self.fail_write {
                return Err(MediaError::FileNotFound(path.to_path_buf()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("write {} -> {}", video.path.display(), path.display()));
            Ok(())
        }
    }

    fn video() -> VideoHandle {
        VideoHandle {
            path: PathBuf::from("in.mp4"),
            duration: 10.0,
            has_audio: true,
        }
    }

    fn iv(start: f64, end: f64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[tokio::test]
    async fn test_assemble_in_order() {
        let toolkit = RecordingToolkit::default();
        let keep = vec![iv(0.0, 2.0), iv(5.0, 7.0), iv(9.0, 10.0)];

        let out = assemble_clips(&toolkit, &video(), &keep, Path::new("out.mp4"))
            .await
            .unwrap();

        assert_eq!(out.clip_count, 3);
        assert!((out.duration - 5.0).abs() < 1e-9);
        assert_eq!(
            toolkit.calls(),
            vec![
                "extract [0.000s, 2.000s)",
                "extract [5.000s, 7.000s)",
                "extract [9.000s, 10.000s)",
                "concat 3",
                "write joined.mp4 -> out.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_keep_writes_nothing() {
        let toolkit = RecordingToolkit::default();
        let result = assemble_clips(&toolkit, &video(), &[], Path::new("out.mp4")).await;

        assert!(matches!(result, Err(WriteError::NothingToWrite)));
        assert!(toolkit.calls().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_keep_rejected() {
        let toolkit = RecordingToolkit::default();
        let keep = vec![iv(0.0, 3.0), iv(2.0, 4.0)];

        let result = assemble_clips(&toolkit, &video(), &keep, Path::new("out.mp4")).await;
        assert!(matches!(result, Err(WriteError::Unordered(_))));
        assert!(toolkit.calls().is_empty());
    }

    #[tokio::test]
    async fn test_extract_failure_stops_before_write() {
        let toolkit = RecordingToolkit {
            fail_extract_at: Some(1),
            ..Default::default()
        };
        let keep = vec![iv(0.0, 1.0), iv(2.0, 3.0), iv(4.0, 5.0)];

        let result = assemble_clips(&toolkit, &video(), &keep, Path::new("out.mp4")).await;

        assert!(matches!(result, Err(WriteError::Extract { index: 1, .. })));
        assert_eq!(toolkit.calls(), vec!["extract [0.000s, 1.000s)"]);
    }

    #[tokio::test]
    async fn test_write_failure_is_persist_error() {
        let toolkit = RecordingToolkit {
            fail_write: true,
            ..Default::default()
        };
        let result =
            assemble_clips(&toolkit, &video(), &[iv(0.0, 1.0)], Path::new("out.mp4")).await;

        match result {
            Err(WriteError::Persist { path, .. }) => assert_eq!(path, PathBuf::from("out.mp4")),
            other => panic!("expected persist error, got {:?}", other),
        }
    }

    #[test]
    fn test_container_ext() {
        assert_eq!(container_ext(Path::new("/a/b/talk.mkv")), "mkv");
        assert_eq!(container_ext(Path::new("/a/b/talk")), "mp4");
    }
}
