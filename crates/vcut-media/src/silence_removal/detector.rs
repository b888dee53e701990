//! State machine for converting a loudness profile into silence and keep
//! intervals.
//!
//! # State Machine
//!
//! ```text
//!                      level <= threshold
//!     ┌─────────────────────────────────────────────────┐
//!     │                                                 ▼
//! ┌─────────┐                                     ┌─────────┐
//! │ InLoud  │◄────────────────────────────────────│InSilence│
//! └─────────┘        level > threshold            └─────────┘
//!                  (close the run; keep it as
//!                   silence if >= min length)
//! ```
//!
//! A run covers the time its samples represent: it starts at the first
//! silent sample's timestamp and ends at the next loud sample's timestamp,
//! or at the total duration when the audio ends silent.

use serde::Serialize;
use tracing::debug;

use vcut_models::{total_duration, Interval, LoudnessSample};

/// Slack for float error when comparing a run against the minimum length.
const DURATION_EPSILON: f64 = 1e-9;

/// Label indicating whether a segment should be kept or cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLabel {
    /// Keep this segment in the output.
    Keep,
    /// Cut (remove) this segment from the output.
    Cut,
}

/// A time segment with a Keep or Cut label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Whether to keep or cut this segment.
    pub label: SegmentLabel,
}

impl Segment {
    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Internal state for the detector state machine.
enum State {
    /// Last sample was above the threshold.
    InLoud,
    /// Inside a silent run that started at `start`.
    InSilence { start: f64 },
}

/// Incremental silence detector fed one loudness sample at a time.
pub struct SilenceDetector {
    threshold_db: f64,
    min_silence_length: f64,
    total_duration: f64,
    state: State,
    silence: Vec<Interval>,
    last_timestamp: f64,
}

impl SilenceDetector {
    /// Create a detector for a timeline of `total_duration` seconds.
    pub fn new(threshold_db: f64, min_silence_length: f64, total_duration: f64) -> Self {
        Self {
            threshold_db,
            min_silence_length: min_silence_length.max(0.0),
            total_duration: total_duration.max(0.0),
            state: State::InLoud,
            silence: Vec::new(),
            last_timestamp: f64::NEG_INFINITY,
        }
    }

    /// Process a single loudness sample.
    ///
    /// Samples must arrive in ascending timestamp order; out-of-order samples
    /// and samples at or past the total duration are ignored.
    pub fn ingest(&mut self, sample: LoudnessSample) {
        if sample.timestamp >= self.total_duration || sample.timestamp < self.last_timestamp {
            return;
        }
        self.last_timestamp = sample.timestamp;

        let is_silent = sample.level <= self.threshold_db;

        match (&self.state, is_silent) {
            (State::InLoud, true) => {
                self.state = State::InSilence {
                    start: sample.timestamp,
                };
            }
            (State::InSilence { start }, false) => {
                let start = *start;
                self.close_run(start, sample.timestamp);
                self.state = State::InLoud;
            }
            _ => {}
        }
    }

    /// Record a finished silent run if it is long enough.
    fn close_run(&mut self, start: f64, end: f64) {
        let Some(run) = (Interval { start, end }).clamp_to(0.0, self.total_duration) else {
            return;
        };

        if run.duration() + DURATION_EPSILON >= self.min_silence_length {
            self.silence.push(run);
        }
    }

    /// Finish the scan and compute both interval sets.
    pub fn finalize(mut self) -> DetectedIntervals {
        if let State::InSilence { start } = self.state {
            self.close_run(start, self.total_duration);
        }

        let keep = keep_intervals(&self.silence, self.total_duration);

        debug!(
            silence_intervals = self.silence.len(),
            keep_intervals = keep.len(),
            silence_secs = total_duration(&self.silence),
            total_secs = self.total_duration,
            "Silence detection complete"
        );

        DetectedIntervals {
            silence: self.silence,
            keep,
            total_duration: self.total_duration,
        }
    }
}

/// Complement of `silence` within `[0, total_duration]`.
///
/// `silence` must be sorted and disjoint. Gaps of zero or negative length are
/// dropped.
pub fn keep_intervals(silence: &[Interval], total_duration: f64) -> Vec<Interval> {
    let mut keep = Vec::with_capacity(silence.len() + 1);
    let mut cursor = 0.0f64;

    for interval in silence {
        if interval.start > cursor {
            keep.push(Interval {
                start: cursor,
                end: interval.start.min(total_duration),
            });
        }
        cursor = cursor.max(interval.end);
    }

    if total_duration > cursor {
        keep.push(Interval {
            start: cursor,
            end: total_duration,
        });
    }

    keep.retain(|i| !i.is_empty());
    keep
}

/// Scan a whole profile at once.
pub fn detect_intervals(
    profile: &[LoudnessSample],
    total_duration: f64,
    threshold_db: f64,
    min_silence_length: f64,
) -> DetectedIntervals {
    let mut detector = SilenceDetector::new(threshold_db, min_silence_length, total_duration);
    for sample in profile {
        detector.ingest(*sample);
    }
    detector.finalize()
}

/// Silence and keep intervals for one timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedIntervals {
    /// Sorted, disjoint, non-adjacent silent spans.
    pub silence: Vec<Interval>,
    /// Sorted, disjoint complement of `silence`.
    pub keep: Vec<Interval>,
    /// Length of the timeline in seconds.
    pub total_duration: f64,
}

impl DetectedIntervals {
    /// Both interval sets merged into one ascending Keep/Cut timeline.
    pub fn timeline(&self) -> Vec<Segment> {
        let cuts = self.silence.iter().map(|i| (i, SegmentLabel::Cut));
        let keeps = self.keep.iter().map(|i| (i, SegmentLabel::Keep));

        let mut segments: Vec<Segment> = cuts
            .chain(keeps)
            .map(|(i, label)| Segment {
                start: i.start,
                end: i.end,
                label,
            })
            .collect();
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        segments
    }

    /// Total silent time in seconds.
    pub fn silence_duration(&self) -> f64 {
        total_duration(&self.silence)
    }

    /// Total kept time in seconds.
    pub fn keep_duration(&self) -> f64 {
        total_duration(&self.keep)
    }

    /// True when nothing would remain after cutting.
    pub fn is_all_silence(&self) -> bool {
        self.keep.is_empty()
    }

    /// Aggregate statistics over the timeline.
    pub fn stats(&self) -> SegmentStats {
        compute_segment_stats(&self.timeline())
    }
}

/// Calculate statistics about the segments.
pub fn compute_segment_stats(segments: &[Segment]) -> SegmentStats {
    let mut total_keep_secs = 0.0;
    let mut total_cut_secs = 0.0;
    let mut keep_count = 0usize;
    let mut cut_count = 0usize;

    for segment in segments {
        let duration = segment.duration();
        match segment.label {
            SegmentLabel::Keep => {
                total_keep_secs += duration;
                keep_count += 1;
            }
            SegmentLabel::Cut => {
                total_cut_secs += duration;
                cut_count += 1;
            }
        }
    }

    let total = total_keep_secs + total_cut_secs;
    let keep_ratio = if total > 0.0 { total_keep_secs / total } else { 1.0 };

    SegmentStats {
        total_keep_secs,
        total_cut_secs,
        keep_count,
        cut_count,
        keep_ratio,
    }
}

/// Statistics about Keep/Cut segments.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentStats {
    /// Total duration of Keep segments in seconds.
    pub total_keep_secs: f64,
    /// Total duration of Cut segments in seconds.
    pub total_cut_secs: f64,
    /// Number of Keep segments.
    pub keep_count: usize,
    /// Number of Cut segments.
    pub cut_count: usize,
    /// Ratio of kept content (0.0 to 1.0).
    pub keep_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUD: f64 = -10.0;
    const QUIET: f64 = -80.0;
    const THRESHOLD: f64 = -50.0;

    /// Profile with one sample every `step` seconds.
    fn profile(levels: &[f64], step: f64) -> Vec<LoudnessSample> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| LoudnessSample::new(i as f64 * step, level))
            .collect()
    }

    fn iv(start: f64, end: f64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn test_all_loud() {
        let samples = profile(&[LOUD; 10], 0.5);
        let detected = detect_intervals(&samples, 5.0, THRESHOLD, 0.5);

        assert!(detected.silence.is_empty());
        assert_eq!(detected.keep, vec![iv(0.0, 5.0)]);
    }

    #[test]
    fn test_all_silence() {
        let samples = profile(&[QUIET; 10], 0.5);
        let detected = detect_intervals(&samples, 5.0, THRESHOLD, 0.5);

        assert_eq!(detected.silence, vec![iv(0.0, 5.0)]);
        assert!(detected.keep.is_empty());
        assert!(detected.is_all_silence());
    }

    #[test]
    fn test_loud_silence_loud() {
        // 1s loud, 2s silent, 1s loud
        let levels = [LOUD, LOUD, QUIET, QUIET, QUIET, QUIET, LOUD, LOUD];
        let detected = detect_intervals(&profile(&levels, 0.5), 4.0, THRESHOLD, 0.5);

        assert_eq!(detected.silence, vec![iv(1.0, 3.0)]);
        assert_eq!(detected.keep, vec![iv(0.0, 1.0), iv(3.0, 4.0)]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let levels = [LOUD, THRESHOLD, THRESHOLD, LOUD];
        let detected = detect_intervals(&profile(&levels, 0.5), 2.0, THRESHOLD, 0.5);
        assert_eq!(detected.silence, vec![iv(0.5, 1.5)]);
    }

    #[test]
    fn test_short_silence_not_cut() {
        // A single 0.25s quiet sample is shorter than the 0.5s minimum
        let levels = [LOUD, LOUD, QUIET, LOUD];
        let detected = detect_intervals(&profile(&levels, 0.25), 1.0, THRESHOLD, 0.5);

        assert!(detected.silence.is_empty());
        assert_eq!(detected.keep, vec![iv(0.0, 1.0)]);
    }

    #[test]
    fn test_exact_min_length_is_cut() {
        let levels = [LOUD, QUIET, QUIET, LOUD];
        let detected = detect_intervals(&profile(&levels, 0.25), 1.0, THRESHOLD, 0.5);
        assert_eq!(detected.silence, vec![iv(0.25, 0.75)]);
    }

    #[test]
    fn test_exact_min_length_survives_float_error() {
        // 0.7 - 0.2 is slightly below 0.5 in binary floating point
        let samples = vec![
            LoudnessSample::new(0.0, LOUD),
            LoudnessSample::new(0.2, QUIET),
            LoudnessSample::new(0.7, LOUD),
        ];
        let detected = detect_intervals(&samples, 1.0, THRESHOLD, 0.5);
        assert_eq!(detected.silence.len(), 1);
    }

    #[test]
    fn test_trailing_silence_runs_to_total_duration() {
        let levels = [LOUD, LOUD, QUIET, QUIET];
        let detected = detect_intervals(&profile(&levels, 0.5), 2.1, THRESHOLD, 0.5);

        assert_eq!(detected.silence, vec![iv(1.0, 2.1)]);
        assert_eq!(detected.keep, vec![iv(0.0, 1.0)]);
    }

    #[test]
    fn test_video_shorter_than_min_silence() {
        let samples = profile(&[QUIET; 3], 0.1);
        let detected = detect_intervals(&samples, 0.3, THRESHOLD, 0.5);

        assert!(detected.silence.is_empty());
        assert_eq!(detected.keep, vec![iv(0.0, 0.3)]);
    }

    #[test]
    fn test_samples_past_duration_are_ignored() {
        let samples = vec![
            LoudnessSample::new(0.0, LOUD),
            LoudnessSample::new(1.0, QUIET),
            LoudnessSample::new(2.0, QUIET),
            LoudnessSample::new(3.0, LOUD),
        ];
        let detected = detect_intervals(&samples, 2.0, THRESHOLD, 0.5);
        assert_eq!(detected.silence, vec![iv(1.0, 2.0)]);
    }

    #[test]
    fn test_non_uniform_profile() {
        let samples = vec![
            LoudnessSample::new(0.0, LOUD),
            LoudnessSample::new(0.3, QUIET),
            LoudnessSample::new(0.4, QUIET),
            LoudnessSample::new(1.7, LOUD),
            LoudnessSample::new(1.8, QUIET),
        ];
        let detected = detect_intervals(&samples, 2.0, THRESHOLD, 0.5);

        assert_eq!(detected.silence, vec![iv(0.3, 1.7)]);
        assert_eq!(detected.keep, vec![iv(0.0, 0.3), iv(1.7, 2.0)]);
    }

    #[test]
    fn test_keep_intervals_drop_degenerate_gaps() {
        let silence = vec![iv(0.0, 1.0), iv(1.0, 2.0), iv(3.0, 4.0)];
        let keep = keep_intervals(&silence, 4.0);
        assert_eq!(keep, vec![iv(2.0, 3.0)]);
    }

    #[test]
    fn test_keep_intervals_without_silence() {
        assert_eq!(keep_intervals(&[], 7.5), vec![iv(0.0, 7.5)]);
        assert!(keep_intervals(&[], 0.0).is_empty());
    }

    #[test]
    fn test_timeline_alternates() {
        let levels = [QUIET, QUIET, LOUD, LOUD, QUIET, QUIET, LOUD];
        let detected = detect_intervals(&profile(&levels, 0.5), 3.5, THRESHOLD, 0.5);

        let labels: Vec<_> = detected.timeline().iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                SegmentLabel::Cut,
                SegmentLabel::Keep,
                SegmentLabel::Cut,
                SegmentLabel::Keep
            ]
        );
    }

    #[test]
    fn test_segment_stats() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 1.0,
                label: SegmentLabel::Keep,
            },
            Segment {
                start: 1.0,
                end: 2.0,
                label: SegmentLabel::Cut,
            },
            Segment {
                start: 2.0,
                end: 3.0,
                label: SegmentLabel::Keep,
            },
        ];

        let stats = compute_segment_stats(&segments);
        assert!((stats.total_keep_secs - 2.0).abs() < 1e-9);
        assert!((stats.total_cut_secs - 1.0).abs() < 1e-9);
        assert_eq!(stats.keep_count, 2);
        assert_eq!(stats.cut_count, 1);
        assert!((stats.keep_ratio - 0.667).abs() < 0.01);
    }

    #[test]
    fn test_incremental_matches_batch() {
        let levels = [LOUD, QUIET, QUIET, QUIET, LOUD, QUIET];
        let samples = profile(&levels, 0.25);

        let mut detector = SilenceDetector::new(THRESHOLD, 0.5, 1.5);
        for s in &samples {
            detector.ingest(*s);
        }
        let incremental = detector.finalize();
        assert_eq!(incremental.silence.len(), 1);
        let batch = detect_intervals(&samples, 1.5, THRESHOLD, 0.5);
        assert_eq!(incremental, batch);
    }
}
