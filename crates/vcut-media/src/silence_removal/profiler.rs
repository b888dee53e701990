//! Loudness profiling.
//!
//! Walks the source audio one chunk at a time and reduces every chunk to a
//! single RMS level in dB. Only the chunk being measured is held in memory,
//! whatever the length of the input.

use tracing::{debug, trace};

use vcut_models::{AudioChunk, LoudnessProfile, LoudnessSample};

use super::config::SilenceRemovalConfig;
use super::source::{AudioResult, AudioSource};

/// Level reported for digital silence (RMS of exactly zero).
pub const SILENCE_FLOOR_DB: f64 = -120.0;

/// Convert an RMS amplitude to dB relative to `reference_db`.
///
/// Zero, non-finite or vanishingly small amplitudes map to
/// [`SILENCE_FLOOR_DB`].
pub fn level_db(rms: f64, reference_db: f64) -> f64 {
    if !rms.is_finite() || rms <= 0.0 {
        return SILENCE_FLOOR_DB;
    }
    (20.0 * rms.log10() - reference_db).max(SILENCE_FLOOR_DB)
}

/// Single-pass iterator over consecutive chunks of an [`AudioSource`].
///
/// Chunks tile `0..total_samples()` exactly; the last one may be shorter.
/// Iteration stops after the first read error.
pub struct AudioChunks<'a, S: AudioSource + ?Sized> {
    source: &'a mut S,
    chunk_samples: u64,
    next: u64,
    total: u64,
}

impl<'a, S: AudioSource + ?Sized> AudioChunks<'a, S> {
    pub fn new(source: &'a mut S, chunk_samples: usize) -> Self {
        let total = source.total_samples();
        Self {
            source,
            chunk_samples: chunk_samples.max(1) as u64,
            next: 0,
            total,
        }
    }

    /// Number of chunks not yet yielded.
    pub fn remaining(&self) -> u64 {
        (self.total - self.next).div_ceil(self.chunk_samples)
    }
}

impl<S: AudioSource + ?Sized> Iterator for AudioChunks<'_, S> {
    type Item = AudioResult<AudioChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }

        let start = self.next;
        let end = (start + self.chunk_samples).min(self.total);
        let sample_rate = self.source.sample_rate();

        match self.source.read_samples(start..end) {
            Ok(samples) => {
                self.next = end;
                Some(Ok(AudioChunk {
                    start: start as f64 / sample_rate as f64,
                    sample_rate,
                    samples,
                }))
            }
            Err(e) => {
                self.next = self.total;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining() as usize;
        (remaining, Some(remaining))
    }
}

/// Measure the loudness of `source` in windows of `config.chunk_size`.
///
/// Emits one [`LoudnessSample`] per chunk, stamped with the chunk start.
pub fn profile_loudness<S: AudioSource + ?Sized>(
    source: &mut S,
    config: &SilenceRemovalConfig,
) -> AudioResult<LoudnessProfile> {
    let chunk_samples = config.chunk_samples(source.sample_rate());
    let chunks = AudioChunks::new(source, chunk_samples);

    debug!(
        chunk_samples,
        chunks = chunks.remaining(),
        reference_db = config.reference_db,
        "Profiling loudness"
    );

    let mut profile = LoudnessProfile::with_capacity(chunks.remaining() as usize);
    for chunk in chunks {
        let chunk = chunk?;
        let level = level_db(chunk.rms(), config.reference_db);
        trace!(timestamp = chunk.start, level, "Chunk measured");
        profile.push(LoudnessSample::new(chunk.start, level));
    }

    debug!(samples = profile.len(), "Loudness profile complete");
    Ok(profile)
}
