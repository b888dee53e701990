//! Time intervals on the source timeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interval construction error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntervalError {
    #[error("Interval bounds must be finite (start: {start}, end: {end})")]
    NotFinite { start: f64, end: f64 },

    #[error("Interval start {start} is after end {end}")]
    Reversed { start: f64, end: f64 },
}

/// A closed-open span `[start, end)` in seconds.
///
/// Invariant: `start <= end`, both finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Interval {
    /// Create a new interval, validating the bounds.
    pub fn new(start: f64, end: f64) -> Result<Self, IntervalError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(IntervalError::NotFinite { start, end });
        }
        if start > end {
            return Err(IntervalError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Duration of this interval in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when the interval covers no time.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Clip this interval to `[lo, hi]`.
    ///
    /// Returns `None` when nothing of positive length remains.
    pub fn clamp_to(&self, lo: f64, hi: f64) -> Option<Self> {
        let start = self.start.max(lo);
        let end = self.end.min(hi);
        (end > start).then_some(Self { start, end })
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}s, {:.3}s)", self.start, self.end)
    }
}

/// Sum of the durations of a set of intervals.
pub fn total_duration(intervals: &[Interval]) -> f64 {
    intervals.iter().map(Interval::duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_reversed() {
        assert_eq!(
            Interval::new(2.0, 1.0),
            Err(IntervalError::Reversed { start: 2.0, end: 1.0 })
        );
        assert!(Interval::new(f64::NAN, 1.0).is_err());
        assert!(Interval::new(1.0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_clamp_to() {
        let interval = Interval::new(-1.0, 5.0).unwrap();
        let clamped = interval.clamp_to(0.0, 4.0).unwrap();
        assert_eq!(clamped, Interval { start: 0.0, end: 4.0 });

        let outside = Interval::new(5.0, 6.0).unwrap();
        assert!(outside.clamp_to(0.0, 4.0).is_none());
    }

    #[test]
    fn test_total_duration() {
        let intervals = vec![
            Interval::new(0.0, 2.0).unwrap(),
            Interval::new(5.0, 7.0).unwrap(),
            Interval::new(9.0, 10.0).unwrap(),
        ];
        assert!((total_duration(&intervals) - 5.0).abs() < 1e-9);
    }
}
