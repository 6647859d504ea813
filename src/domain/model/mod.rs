// Domain models - Core types and data structures

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

pub mod analysis;

pub use analysis::*;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self {
            seconds: total_seconds,
        }
    }

    /// Convert to Duration
    pub fn to_duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds.max(0.0))
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        // Try parsing as seconds (float)
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if seconds < 0.0 || !seconds.is_finite() {
                return Err(DomainError::InvalidClip(
                    "Time cannot be negative".to_string(),
                ));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let bad = |what: &str| DomainError::InvalidClip(format!("Invalid {} in '{}'", what, trimmed));

        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = minutes.parse::<u32>().map_err(|_| bad("minutes"))?;
                let seconds = seconds.parse::<f64>().map_err(|_| bad("seconds"))?;
                if !(0.0..60.0).contains(&seconds) {
                    return Err(bad("seconds"));
                }
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours.parse::<u32>().map_err(|_| bad("hours"))?;
                let minutes = minutes.parse::<u32>().map_err(|_| bad("minutes"))?;
                let seconds = seconds.parse::<f64>().map_err(|_| bad("seconds"))?;
                if minutes >= 60 {
                    return Err(bad("minutes"));
                }
                if !(0.0..60.0).contains(&seconds) {
                    return Err(bad("seconds"));
                }
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(DomainError::InvalidClip(format!(
                "Invalid time format '{}'. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                trimmed
            ))),
        }
    }

    /// Parse analysis timestamps; anything unparseable is zero
    pub fn parse_lenient(timestamp: &str) -> Self {
        let trimmed = timestamp.trim();
        if trimmed.is_empty() {
            return Self::from_seconds(0.0);
        }

        if !trimmed.contains(':') {
            let seconds = trimmed.parse::<f64>().unwrap_or(0.0);
            return Self::from_seconds(if seconds.is_finite() { seconds } else { 0.0 });
        }

        let parts: Result<Vec<f64>, _> = trimmed.split(':').map(|p| p.trim().parse::<f64>()).collect();
        let seconds = match parts.as_deref() {
            Ok([h, m, s]) => h * 3600.0 + m * 60.0 + s,
            Ok([m, s]) => m * 60.0 + s,
            _ => 0.0,
        };
        Self::from_seconds(seconds)
    }

    /// Format as H:MM:SS.mmm or M:SS.mmm
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// A user-supplied reference to a video after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub raw: String,
    pub canonical: String,
    /// 11-character identifier, only for recognized video-sharing hosts
    pub video_id: Option<String>,
}

/// Result of a successful provider query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    pub filename: String,
    /// Audio and video multiplexed in one stream
    pub muxed: bool,
    pub provider: String,
}

/// One failed provider/instance query, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionAttempt {
    pub provider: String,
    pub instance: String,
    pub reason: String,
}

impl fmt::Display for ResolutionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.provider, self.instance, self.reason)
    }
}

/// Media container inferred from a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    WebM,
    Mov,
}

impl Container {
    /// Infer from a MIME type, mp4 when nothing more specific matches
    pub fn from_content_type(content_type: &str) -> Self {
        let lowered = content_type.to_ascii_lowercase();
        if lowered.contains("webm") {
            Container::WebM
        } else if lowered.contains("quicktime") {
            Container::Mov
        } else {
            Container::Mp4
        }
    }

    /// Infer from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Some(Container::Mp4),
            "webm" => Some(Container::WebM),
            "mov" => Some(Container::Mov),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::WebM => "webm",
            Container::Mov => "mov",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Container::Mp4 => "video/mp4",
            Container::WebM => "video/webm",
            Container::Mov => "video/quicktime",
        }
    }
}

/// Validated, in-memory binary video payload
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub bytes: Vec<u8>,
    pub size: u64,
    /// Content type as declared by the server, if any
    pub declared_content_type: Option<String>,
    /// Final content type, always video/*
    pub content_type: String,
    pub container: Container,
    pub filename: String,
}

impl fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAsset")
            .field("size", &self.size)
            .field("declared_content_type", &self.declared_content_type)
            .field("content_type", &self.content_type)
            .field("container", &self.container)
            .field("filename", &self.filename)
            .finish()
    }
}

/// Time-bounded region of source video selected for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    pub number: u32,
    pub title: String,
    pub start: TimeSpec,
    pub end: TimeSpec,
}

impl ClipSpec {
    /// Create a clip, enforcing `0 <= start < end`
    pub fn new(
        number: u32,
        title: impl Into<String>,
        start: TimeSpec,
        end: TimeSpec,
    ) -> Result<Self, DomainError> {
        let clip = Self {
            number,
            title: title.into(),
            start,
            end,
        };
        clip.validate()?;
        Ok(clip)
    }

    /// Build from an analysis catalog entry
    pub fn from_catalog(entry: &CatalogClip) -> Result<Self, DomainError> {
        Self::new(
            entry.clip_number,
            entry.title.clone(),
            TimeSpec::parse_lenient(&entry.start_time),
            TimeSpec::parse_lenient(&entry.end_time),
        )
    }

    /// Check the clip invariant
    pub fn validate(&self) -> Result<(), DomainError> {
        let (start, end) = (self.start.seconds, self.end.seconds);
        if !start.is_finite() || !end.is_finite() {
            return Err(DomainError::InvalidClip(
                "Clip boundaries must be finite".to_string(),
            ));
        }
        if start < 0.0 {
            return Err(DomainError::InvalidClip(format!(
                "Clip {} starts before zero ({})",
                self.number, start
            )));
        }
        if start >= end {
            return Err(DomainError::InvalidClip(format!(
                "Clip {}: start ({}) must be before end ({})",
                self.number, self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn duration(&self) -> TimeSpec {
        TimeSpec::from_seconds(self.end.seconds - self.start.seconds)
    }
}

/// Target aspect ratio expressed as width:height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const VERTICAL: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Widest accepted ratio; the narrowest is its inverse
    pub const MAX_RATIO: f64 = 4.0;

    /// Parse `W:H` (e.g. `9:16`), between 1:4 and 4:1
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidClip(format!("Invalid aspect ratio '{}', expected W:H", value));
        let (w, h) = value.trim().split_once(':').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        let aspect = Self { width, height };
        if !aspect.is_supported() {
            return Err(DomainError::InvalidClip(format!(
                "Aspect ratio '{}' is out of range (1:4 to 4:1)",
                value.trim()
            )));
        }
        Ok(aspect)
    }

    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_supported(&self) -> bool {
        let ratio = self.ratio();
        (1.0 / Self::MAX_RATIO..=Self::MAX_RATIO).contains(&ratio)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::VERTICAL
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Output quality tier; higher tiers imply larger frames and higher bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityTier {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl QualityTier {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(QualityTier::P720),
            "1080p" | "1080" => Ok(QualityTier::P1080),
            other => Err(DomainError::Config(format!(
                "Invalid quality '{}'. Valid tiers: 720p, 1080p",
                other
            ))),
        }
    }

    /// Pixels along the shorter output edge
    pub fn short_edge(&self) -> u32 {
        match self {
            QualityTier::P720 => 720,
            QualityTier::P1080 => 1080,
        }
    }

    /// Target video bitrate in bits per second
    pub fn video_bitrate(&self) -> u64 {
        match self {
            QualityTier::P720 => 2_500_000,
            QualityTier::P1080 => 5_000_000,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.short_edge())
    }
}

/// Requested output container family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            other => Err(DomainError::Config(format!(
                "Invalid format '{}'. Valid formats: mp4, webm",
                other
            ))),
        }
    }
}

/// Target aspect, quality and format for one export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub aspect: AspectRatio,
    pub quality: QualityTier,
    pub format: OutputFormat,
    pub frame_rate: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            aspect: AspectRatio::VERTICAL,
            quality: QualityTier::P720,
            format: OutputFormat::Mp4,
            frame_rate: 30,
        }
    }
}

/// Export job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExportState {
    #[default]
    Idle,
    Seeking,
    Capturing,
    Finalizing,
    Done,
    Failed,
}

impl ExportState {
    /// Allowed state machine edges
    pub fn can_transition_to(&self, next: ExportState) -> bool {
        use ExportState::*;
        matches!(
            (self, next),
            (Idle, Seeking)
                | (Seeking, Capturing)
                | (Capturing, Finalizing)
                | (Finalizing, Done)
                | (Seeking, Failed)
                | (Capturing, Failed)
                | (Finalizing, Failed)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ExportState::Idle)
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "idle",
            ExportState::Seeking => "seeking",
            ExportState::Capturing => "capturing",
            ExportState::Finalizing => "finalizing",
            ExportState::Done => "done",
            ExportState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A container/codec combination the encoder sink may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncoderProfile {
    pub mime_type: &'static str,
    pub container: Container,
    pub video_codec: Option<&'static str>,
    pub audio_codec: Option<&'static str>,
}

impl EncoderProfile {
    pub fn extension(&self) -> &'static str {
        if self.mime_type.contains("mp4") {
            "mp4"
        } else {
            "webm"
        }
    }
}

/// Finished export, ready to be written out
#[derive(Clone)]
pub struct ExportArtifact {
    pub clip_number: u32,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub profile: EncoderProfile,
    pub has_audio: bool,
}

impl fmt::Debug for ExportArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportArtifact")
            .field("clip_number", &self.clip_number)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .field("has_audio", &self.has_audio)
            .finish()
    }
}
