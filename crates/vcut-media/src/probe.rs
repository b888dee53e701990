//! Stream and duration discovery through ffprobe.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when ffprobe reports none.
const DEFAULT_FPS: f64 = 30.0;

/// What ffprobe reports about a video file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    /// First audio stream, if any.
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    /// Native rate in Hz.
    pub sample_rate: u32,
    pub channels: u32,
}

impl VideoInfo {
    /// Whether the file carries at least one audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// The subset of `ffprobe -show_format -show_streams` output we read.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

impl FfprobeOutput {
    fn first(&self, kind: &str) -> Option<&FfprobeStream> {
        self.streams.iter().find(|s| s.codec_type == kind)
    }
}

impl FfprobeStream {
    fn codec(&self) -> String {
        self.codec_name.clone().unwrap_or_default()
    }

    fn fps(&self) -> Option<f64> {
        [&self.avg_frame_rate, &self.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|r| parse_frame_rate(r))
    }

    fn audio_info(&self) -> AudioStreamInfo {
        AudioStreamInfo {
            codec: self.codec(),
            sample_rate: self
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: self.channels.unwrap_or(0),
        }
    }
}

/// Probe `path` with ffprobe.
///
/// Fails with [`MediaError::InvalidVideo`] when the file has no video stream
/// or no usable duration. A missing audio stream is reported through
/// [`VideoInfo::audio`], not as an error.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json"])
        .args(["-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::Ffprobe {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;
    let video = probe
        .first("video")
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    // Container duration wins over the stream's
    let duration = [&probe.format.duration, &video.duration]
        .into_iter()
        .flatten()
        .filter_map(|d| d.parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::invalid_video("Could not determine duration"))?;

    Ok(VideoInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps: video.fps().unwrap_or(DEFAULT_FPS),
        codec: video.codec(),
        audio: probe.first("audio").map(FfprobeStream::audio_info),
    })
}

/// `"30000/1001"` or `"29.97"`; `None` for a zero denominator.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let (num, den) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_with_audio() {
        let json = br#"{
            "format": {"duration": "12.500000"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "avg_frame_rate": "30/1"},
                {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 12.5).abs() < 1e-9);
        assert_eq!(info.width, 1920);
        assert!(info.has_audio());
        let audio = info.audio.unwrap();
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.channels, 2);
    }

    #[test]
    fn test_parse_probe_without_audio() {
        let json = br#"{
            "format": {"duration": "4.0"},
            "streams": [{"codec_type": "video", "codec_name": "h264"}]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_audio());
    }

    #[test]
    fn test_parse_probe_without_video() {
        let json = br#"{
            "format": {"duration": "4.0"},
            "streams": [{"codec_type": "audio", "codec_name": "aac"}]
        }"#;

        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_parse_probe_without_duration() {
        let json = br#"{
            "format": {},
            "streams": [{"codec_type": "video", "codec_name": "h264"}]
        }"#;

        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
