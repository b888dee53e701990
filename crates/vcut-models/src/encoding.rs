//! Re-encode settings for cut clips.

use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_PRESET: &str = "veryfast";
pub const DEFAULT_CRF: u8 = 20;
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Highest CRF libx264 accepts.
const MAX_CRF: u8 = 51;

/// How each kept clip is re-encoded before concatenation.
///
/// Clips are re-encoded rather than stream-copied so every cut lands on the
/// requested frame instead of the preceding keyframe. Missing JSON fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// FFmpeg video encoder name.
    pub codec: String,
    pub preset: String,
    /// Quality factor; lower is better.
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            preset: DEFAULT_PRESET.into(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.into(),
        }
    }
}

impl EncodingConfig {
    /// Same settings with `crf`, capped at the encoder maximum.
    pub fn with_crf(self, crf: u8) -> Self {
        Self {
            crf: crf.min(MAX_CRF),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_h264_aac() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.audio_codec, "aac");
        assert_eq!(config.crf, DEFAULT_CRF);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let config: EncodingConfig =
            serde_json::from_str(r#"{"crf": 23, "preset": "slow"}"#).unwrap();
        assert_eq!(config.crf, 23);
        assert_eq!(config.preset, "slow");
        assert_eq!(config.audio_bitrate, DEFAULT_AUDIO_BITRATE);
    }

    #[test]
    fn test_crf_is_capped() {
        assert_eq!(EncodingConfig::default().with_crf(90).crf, MAX_CRF);
        assert_eq!(EncodingConfig::default().with_crf(18).crf, 18);
    }
}
