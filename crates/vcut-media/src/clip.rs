//! Sub-clip extraction and concatenation.
//!
//! Cuts are frame accurate: each range is decoded from a fast keyframe seek a
//! few seconds earlier, trimmed with an output seek and re-encoded. The
//! resulting parts share codec parameters, so the concat demuxer can join
//! them with stream copy.

use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use vcut_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Seconds of lead-in decoded before an accurate seek.
const FAST_SEEK_MARGIN_SECS: f64 = 5.0;

/// Split a start time into fast (input) and accurate (output) seek parts.
pub(crate) fn split_seek(start_secs: f64) -> (f64, f64) {
    let fast = (start_secs - FAST_SEEK_MARGIN_SECS).max(0.0);
    (fast, start_secs - fast)
}

/// Extract `[start_secs, start_secs + duration)` from `input` into `output`.
pub async fn extract_segment(
    input: &Path,
    output: &Path,
    start_secs: f64,
    duration: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let (fast_seek, accurate_seek) = split_seek(start_secs);

    debug!(
        input = %input.display(),
        output = %output.display(),
        start_secs,
        duration,
        "Extracting segment with accurate seeking"
    );

    let cmd = FfmpegCommand::new(input, output)
        .seek_input(fast_seek)
        .seek_output(accurate_seek)
        .limit(duration)
        .encode(encoding)
        // Segment timestamps start at zero so the concat demuxer can join them
        .after_input(["-avoid_negative_ts", "make_zero"]);

    let total_ms = (duration * 1000.0).round() as i64;
    FfmpegRunner::new()
        .run_with_progress(&cmd, move |progress| {
            if progress.is_complete {
                debug!(frames = progress.frame, "Segment encode finished");
            } else {
                trace!(
                    percent = progress.percentage(total_ms),
                    speed = progress.speed,
                    "Segment encode progress"
                );
            }
        })
        .await
}

/// Render the concat demuxer list for `parts`.
pub(crate) fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        // Single quotes inside a path must be closed, escaped and reopened
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
        .collect()
}

/// Join `parts` in order into `output` with stream copy.
pub async fn concat_segments(parts: &[PathBuf], list_path: &Path, output: &Path) -> MediaResult<()> {
    tokio::fs::write(list_path, concat_list(parts)).await?;

    let cmd = FfmpegCommand::new(list_path, output)
        .concat_list_input()
        .stream_copy()
        .faststart();

    FfmpegRunner::new().run(&cmd).await?;

    info!(
        segments = parts.len(),
        output = %output.display(),
        "Concatenated segments"
    );
    Ok(())
}
