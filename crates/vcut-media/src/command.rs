//! FFmpeg invocation.
//!
//! [`FfmpegCommand`] assembles an argument list in the order FFmpeg expects
//! (global flags, input options, `-i`, output options, output target).
//! [`FfmpegRunner`] spawns it, forwards `-progress` updates and keeps the tail
//! of FFmpeg's diagnostics for error reports.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::debug;

use vcut_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_progress_line, FfmpegProgress};

/// Trailing stderr lines kept for error reports.
pub(crate) const STDERR_TAIL_LINES: usize = 8;

/// Output target that streams to stdout.
pub const STDOUT_PIPE: &str = "pipe:1";

/// Render seconds the way every time option is passed to FFmpeg.
fn secs(value: f64) -> String {
    format!("{:.6}", value.max(0.0))
}

/// Argument list for one FFmpeg run.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    target: String,
    pre_input: Vec<String>,
    post_input: Vec<String>,
    report_progress: bool,
}

impl FfmpegCommand {
    /// Read `input` and write a file at `output`, overwriting it.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            target: output.as_ref().to_string_lossy().into_owned(),
            pre_input: Vec::new(),
            post_input: Vec::new(),
            report_progress: true,
        }
    }

    /// Read `input` and stream the result to stdout.
    pub fn to_stdout(input: impl AsRef<Path>) -> Self {
        Self {
            report_progress: false,
            ..Self::new(input, STDOUT_PIPE)
        }
    }

    /// Option placed before `-i`.
    pub fn before_input(mut self, arg: impl Into<String>) -> Self {
        self.pre_input.push(arg.into());
        self
    }

    /// Options placed after `-i`, ahead of the output target.
    pub fn after_input<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Keyframe seek on the input; skipped when `seconds` is zero.
    pub fn seek_input(self, seconds: f64) -> Self {
        if seconds <= 0.0 {
            return self;
        }
        self.before_input("-ss").before_input(secs(seconds))
    }

    /// Frame-accurate seek on the decoded stream.
    pub fn seek_output(self, seconds: f64) -> Self {
        self.after_input(["-ss".to_string(), secs(seconds)])
    }

    /// Stop after `seconds` of output.
    pub fn limit(self, seconds: f64) -> Self {
        self.after_input(["-t".to_string(), secs(seconds)])
    }

    /// Re-encode audio and video with `encoding`.
    pub fn encode(self, encoding: &EncodingConfig) -> Self {
        self.after_input([
            "-c:v".to_string(),
            encoding.codec.clone(),
            "-preset".to_string(),
            encoding.preset.clone(),
            "-crf".to_string(),
            encoding.crf.to_string(),
            "-c:a".to_string(),
            encoding.audio_codec.clone(),
            "-b:a".to_string(),
            encoding.audio_bitrate.clone(),
        ])
    }

    /// Copy every stream unchanged.
    pub fn stream_copy(self) -> Self {
        self.after_input(["-c", "copy"])
    }

    /// Treat the input as a concat demuxer list with absolute paths.
    pub fn concat_list_input(self) -> Self {
        self.before_input("-f")
            .before_input("concat")
            .before_input("-safe")
            .before_input("0")
    }

    /// Move the MP4 index to the front of the file.
    pub fn faststart(self) -> Self {
        self.after_input(["-movflags", "+faststart"])
    }

    /// Full argument list, excluding the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ];
        if self.report_progress {
            args.extend(["-progress".to_string(), "pipe:2".to_string()]);
        }

        args.extend(self.pre_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.post_input.iter().cloned());
        args.push(self.target.clone());
        args
    }
}

/// Runs [`FfmpegCommand`]s to completion.
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `cmd`, ignoring progress.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, calling `on_progress` for every `-progress` block.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.args();
        debug!(args = %args.join(" "), "Running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg("stderr not captured", None, None))?;
        let drain = tokio::spawn(drain_stderr(stderr, on_progress));

        let status = child.wait().await?;
        let tail = drain.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }
        Err(MediaError::ffmpeg(
            format!("ffmpeg exited with {}", status),
            (!tail.is_empty()).then(|| Vec::from(tail).join("\n")),
            status.code(),
        ))
    }
}

/// Split stderr into progress updates and a bounded tail of diagnostics.
async fn drain_stderr<F>(stderr: ChildStderr, on_progress: F) -> VecDeque<String>
where
    F: Fn(FfmpegProgress),
{
    let mut lines = BufReader::new(stderr).lines();
    let mut progress = FfmpegProgress::default();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        // Progress lines are bare key=value pairs
        if line.contains('=') && !line.contains(' ') {
            if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                on_progress(snapshot);
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}

/// Locate the `ffmpeg` binary.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::ToolMissing("ffmpeg"))
}

/// Locate the `ffprobe` binary.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::ToolMissing("ffprobe"))
}
