//! FFprobe adapter for source file probing

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::domain::errors::*;

/// What the playback adapter needs to know about a source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub frame_rate: f64,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    /// Locate `ffprobe` on PATH
    pub fn new() -> Result<Self, DomainError> {
        let binary = which::which("ffprobe").map_err(|_| {
            DomainError::PlatformUnsupported("ffprobe was not found on PATH".to_string())
        })?;
        Ok(Self { binary })
    }

    pub async fn probe(&self, path: &Path) -> Result<SourceInfo, DomainError> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DomainError::Playback(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_output(&output.stdout)
    }

    /// Parse `ffprobe -print_format json` output
    pub fn parse_output(json: &[u8]) -> Result<SourceInfo, DomainError> {
        let probe: FfprobeOutput = serde_json::from_slice(json)
            .map_err(|e| DomainError::Playback(format!("Unreadable ffprobe output: {}", e)))?;

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| DomainError::Playback("No video stream found".to_string()))?;

        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(DomainError::Playback(
                    "Video stream has no dimensions".to_string(),
                ))
            }
        };

        let duration = probe
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let frame_rate = video
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
            .unwrap_or(30.0);

        let has_audio = probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(SourceInfo {
            width,
            height,
            duration,
            frame_rate,
            has_audio,
        })
    }
}

/// `num/den` or a plain number; `0/0` is unknown
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (value > 0.0 && value.is_finite()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_reads_video_and_audio() {
        let json = br#"{
            "streams": [
                { "codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30000/1001" },
                { "codec_type": "audio" }
            ],
            "format": { "duration": "63.5" }
        }"#;
        let info = FfprobeAdapter::parse_output(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(info.duration, 63.5);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_output_without_video_fails() {
        let json = br#"{ "streams": [{ "codec_type": "audio" }] }"#;
        assert!(matches!(
            FfprobeAdapter::parse_output(json),
            Err(DomainError::Playback(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("x"), None);
    }
}
