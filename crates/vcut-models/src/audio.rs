//! Audio chunks and loudness samples.

use serde::{Deserialize, Serialize};

/// A bounded slice of mono PCM samples taken from the source audio.
///
/// Chunks are transient: the profiler turns each one into a single
/// [`LoudnessSample`] and drops it.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Offset of the first sample in seconds
    pub start: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples as f32 in range [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioChunk {
    /// Root-mean-square amplitude of the chunk (0.0 when empty).
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let s = s as f64;
                s * s
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }
}

/// Loudness of one chunk, in dB, stamped with the chunk start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessSample {
    /// Chunk start in seconds
    pub timestamp: f64,
    /// Level in dB
    pub level: f64,
}

impl LoudnessSample {
    pub fn new(timestamp: f64, level: f64) -> Self {
        Self { timestamp, level }
    }
}

/// Ordered loudness series for one video, ascending by timestamp.
pub type LoudnessProfile = Vec<LoudnessSample>;
