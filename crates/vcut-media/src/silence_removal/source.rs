//! Audio accessors for the loudness profiler.
//!
//! An [`AudioSource`] hands out mono f32 samples for sample ranges of the
//! source timeline. The FFmpeg-backed source decodes lazily from a pipe, so
//! the full waveform is never resident in memory.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::command::{FfmpegCommand, STDERR_TAIL_LINES};
use crate::error::MediaError;

/// Errors from reading source audio.
#[derive(Error, Debug)]
pub enum AudioReadError {
    #[error("No audio track found in {0}")]
    NoAudioTrack(PathBuf),

    #[error("FFmpeg audio decoding failed: {0}")]
    DecodeFailed(String),

    #[error("Audio stream produced no samples")]
    NoAudioData,

    #[error("Requested samples {start}..{end} outside of 0..{total}")]
    OutOfRange { start: u64, end: u64, total: u64 },

    #[error("Failed to read audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load video: {0}")]
    Media(#[from] MediaError),

    #[error("Audio analysis was interrupted: {0}")]
    Interrupted(String),
}

/// Result type for audio reads.
pub type AudioResult<T> = Result<T, AudioReadError>;

/// Random-access reader of mono samples.
///
/// Implementations must return exactly `range.end - range.start` samples for
/// any range inside `0..total_samples()`.
pub trait AudioSource {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Duration of the audio in seconds.
    fn duration(&self) -> f64;

    /// Samples in `range`, as f32 in [-1.0, 1.0].
    fn read_samples(&mut self, range: Range<u64>) -> AudioResult<Vec<f32>>;

    /// Total number of samples covering `duration()`.
    fn total_samples(&self) -> u64 {
        (self.duration() * self.sample_rate() as f64).round() as u64
    }

    /// Samples for `[start, end)` given in seconds.
    fn read_seconds(&mut self, start: f64, end: f64) -> AudioResult<Vec<f32>> {
        let rate = self.sample_rate() as f64;
        let first = (start.max(0.0) * rate).round() as u64;
        let last = ((end.max(0.0) * rate).round() as u64).min(self.total_samples());
        self.read_samples(first..last.max(first))
    }
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn read_samples(&mut self, range: Range<u64>) -> AudioResult<Vec<f32>> {
        (**self).read_samples(range)
    }

    fn total_samples(&self) -> u64 {
        (**self).total_samples()
    }
}

/// Audio held in memory, mainly for tests and short clips.
#[derive(Debug, Clone)]
pub struct MemoryAudioSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MemoryAudioSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }
}

impl AudioSource for MemoryAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    fn total_samples(&self) -> u64 {
        self.samples.len() as u64
    }

    fn read_samples(&mut self, range: Range<u64>) -> AudioResult<Vec<f32>> {
        let total = self.samples.len() as u64;
        if range.start > range.end || range.end > total {
            return Err(AudioReadError::OutOfRange {
                start: range.start,
                end: range.end,
                total,
            });
        }
        Ok(self.samples[range.start as usize..range.end as usize].to_vec())
    }
}

/// Bytes per decoded f32le sample.
const BYTES_PER_SAMPLE: usize = 4;

/// Terminal state of a decoder that did not deliver audio.
#[derive(Debug, Clone)]
enum StreamFailure {
    Decode(String),
    Empty,
}

impl StreamFailure {
    fn to_error(&self) -> AudioReadError {
        match self {
            Self::Decode(message) => AudioReadError::DecodeFailed(message.clone()),
            Self::Empty => AudioReadError::NoAudioData,
        }
    }
}

/// Collect the last diagnostic lines of a decoder's stderr on a thread.
fn spawn_stderr_tail(stderr: ChildStderr) -> JoinHandle<Vec<String>> {
    std::thread::spawn(move || {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if line.trim().is_empty() {
                continue;
            }
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        Vec::from(tail)
    })
}

/// Streams the first audio track of a media file through FFmpeg.
///
/// Audio is decoded to mono f32le at the requested rate. Ranges read in
/// ascending order are served from one decoder process; a backwards read
/// restarts decoding with a seek. If the stream ends before the probed
/// duration, the remainder reads as digital silence.
///
/// A decoder failure is terminal: every later read returns the same error.
pub struct FfmpegAudioSource {
    input: PathBuf,
    sample_rate: u32,
    duration: f64,
    program: PathBuf,
    leading_args: Vec<String>,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    stderr_tail: Option<JoinHandle<Vec<String>>>,
    /// Index of the next sample the pipe will yield.
    position: u64,
    /// Sample index the current decoder was started at.
    started_at: u64,
    /// Samples actually decoded since the last (re)start.
    decoded: u64,
    exhausted: bool,
    failure: Option<StreamFailure>,
}

impl FfmpegAudioSource {
    /// Prepare a source for `input`; decoding starts on the first read.
    pub fn new(input: impl AsRef<Path>, sample_rate: u32, duration: f64) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            sample_rate,
            duration,
            program: PathBuf::from("ffmpeg"),
            leading_args: Vec::new(),
            child: None,
            reader: None,
            stderr_tail: None,
            position: 0,
            started_at: 0,
            decoded: 0,
            exhausted: false,
            failure: None,
        }
    }

    /// Decode with `program`, passing `leading` ahead of the FFmpeg arguments.
    pub fn with_decoder<I, S>(mut self, program: impl Into<PathBuf>, leading: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.leading_args = leading.into_iter().map(Into::into).collect();
        self
    }

    /// Start (or restart) the decoder at sample `at`.
    fn spawn_at(&mut self, at: u64) -> AudioResult<()> {
        self.shutdown();

        let seek_secs = at as f64 / self.sample_rate as f64;
        let args = FfmpegCommand::to_stdout(&self.input)
            .seek_input(seek_secs)
            .after_input(["-map", "0:a:0", "-vn", "-ac", "1", "-ar"])
            .after_input([self.sample_rate.to_string()])
            .after_input(["-f", "f32le"])
            .args();

        debug!(
            input = %self.input.display(),
            seek_secs,
            sample_rate = self.sample_rate,
            "Starting audio decoder"
        );

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AudioReadError::DecodeFailed(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AudioReadError::DecodeFailed("stdout not captured".to_string()))?;

        self.stderr_tail = child.stderr.take().map(spawn_stderr_tail);
        self.reader = Some(BufReader::new(stdout));
        self.child = Some(child);
        self.position = at;
        self.started_at = at;
        self.decoded = 0;
        self.exhausted = false;
        Ok(())
    }

    /// Read up to `count` samples from the pipe into `out`.
    ///
    /// Returns the number of samples appended; fewer than `count` means the
    /// stream ended.
    fn pull(&mut self, count: usize, out: &mut Vec<f32>) -> AudioResult<usize> {
        if self.exhausted || count == 0 {
            return Ok(0);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };

        let mut bytes = vec![0u8; count * BYTES_PER_SAMPLE];
        let mut filled = 0;
        while filled < bytes.len() {
            match reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let whole = filled / BYTES_PER_SAMPLE;
        out.extend(
            bytes[..whole * BYTES_PER_SAMPLE]
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        self.position += whole as u64;
        self.decoded += whole as u64;

        if whole < count {
            self.finish_stream()?;
        }
        Ok(whole)
    }

    /// Reap the decoder after EOF and surface decode failures.
    fn finish_stream(&mut self) -> AudioResult<()> {
        self.exhausted = true;
        self.reader = None;

        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            let tail = self
                .stderr_tail
                .take()
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default();

            if !status.success() {
                let mut message = format!("{} exited with {}", self.program.display(), status);
                if !tail.is_empty() {
                    message.push_str(": ");
                    message.push_str(&tail.join("\n"));
                }
                return Err(self.fail(StreamFailure::Decode(message)));
            }
        }

        if self.decoded == 0 && self.started_at == 0 {
            return Err(self.fail(StreamFailure::Empty));
        }

        let expected = self.total_samples();
        if self.position < expected {
            warn!(
                decoded_until = self.position,
                expected,
                "Audio track ended early, treating the remainder as silence"
            );
        }
        Ok(())
    }

    fn fail(&mut self, failure: StreamFailure) -> AudioReadError {
        let err = failure.to_error();
        self.failure = Some(failure);
        err
    }

    fn shutdown(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_tail.take() {
            let _ = handle.join();
        }
    }
}

impl AudioSource for FfmpegAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn read_samples(&mut self, range: Range<u64>) -> AudioResult<Vec<f32>> {
        let total = self.total_samples();
        if range.start > range.end || range.end > total {
            return Err(AudioReadError::OutOfRange {
                start: range.start,
                end: range.end,
                total,
            });
        }

        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }

        let rewind = range.start < self.position;
        if (self.reader.is_none() && !self.exhausted) || rewind {
            self.spawn_at(range.start)?;
        }

        // Skip forward to the start of the range
        let mut scratch = Vec::new();
        while self.position < range.start && !self.exhausted {
            scratch.clear();
            let gap = (range.start - self.position).min(64 * 1024) as usize;
            self.pull(gap, &mut scratch)?;
        }

        let wanted = (range.end - range.start) as usize;
        let mut samples = Vec::with_capacity(wanted);
        if self.position == range.start {
            self.pull(wanted, &mut samples)?;
        }

        if samples.len() < wanted {
            trace!(
                got = samples.len(),
                wanted,
                "Padding past end of audio stream with silence"
            );
            // Past the decoded end: keep the position moving with the timeline
            self.position = self.position.max(range.end);
            samples.resize(wanted, 0.0);
        }

        Ok(samples)
    }
}

impl Drop for FfmpegAudioSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
