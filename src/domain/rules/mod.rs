// Domain rules - Business logic and policies

use std::fmt;
use std::time::Duration;

use crate::domain::model::*;

/// Source region to sample when compositing into the output canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Business rules for frame geometry
pub struct FrameGeometry;

impl FrameGeometry {
    /// Centre crop of a `src_w x src_h` frame to `target` aspect.
    ///
    /// A source wider than the target loses columns symmetrically, a narrower
    /// one loses rows symmetrically.
    pub fn center_crop(src_w: u32, src_h: u32, target: AspectRatio) -> CropRect {
        let (w, h) = (src_w as f64, src_h as f64);
        let target_ratio = target.ratio();

        if h <= 0.0 || w <= 0.0 {
            return CropRect {
                x: 0.0,
                y: 0.0,
                width: w.max(0.0),
                height: h.max(0.0),
            };
        }

        if w / h > target_ratio {
            let width = h * target_ratio;
            CropRect {
                x: (w - width) / 2.0,
                y: 0.0,
                width,
                height: h,
            }
        } else {
            let height = w / target_ratio;
            CropRect {
                x: 0.0,
                y: (h - height) / 2.0,
                width: w,
                height,
            }
        }
    }

    /// Output canvas size: the tier sets the short edge, the aspect the long one.
    /// Both edges are rounded to even numbers for the encoder.
    pub fn output_dimensions(aspect: AspectRatio, quality: QualityTier) -> (u32, u32) {
        let short = quality.short_edge() as f64;
        let ratio = aspect
            .ratio()
            .clamp(1.0 / AspectRatio::MAX_RATIO, AspectRatio::MAX_RATIO);
        let (w, h) = if ratio <= 1.0 {
            (short, short / ratio)
        } else {
            (short * ratio, short)
        };
        (round_even(w), round_even(h))
    }
}

fn round_even(value: f64) -> u32 {
    let rounded = value.round() as u32;
    if rounded % 2 == 0 {
        rounded
    } else {
        rounded.checked_add(1).unwrap_or(rounded - 1)
    }
}

/// Ordered encoder candidates for each requested format
pub struct EncoderNegotiation;

const MP4_H264_AAC: EncoderProfile = EncoderProfile {
    mime_type: "video/mp4;codecs=h264,aac",
    container: Container::Mp4,
    video_codec: Some("h264"),
    audio_codec: Some("aac"),
};
const MP4_PLAIN: EncoderProfile = EncoderProfile {
    mime_type: "video/mp4",
    container: Container::Mp4,
    video_codec: None,
    audio_codec: None,
};
const WEBM_H264_OPUS: EncoderProfile = EncoderProfile {
    mime_type: "video/webm;codecs=h264,opus",
    container: Container::WebM,
    video_codec: Some("h264"),
    audio_codec: Some("opus"),
};
const WEBM_VP9_OPUS: EncoderProfile = EncoderProfile {
    mime_type: "video/webm;codecs=vp9,opus",
    container: Container::WebM,
    video_codec: Some("vp9"),
    audio_codec: Some("opus"),
};
const WEBM_PLAIN: EncoderProfile = EncoderProfile {
    mime_type: "video/webm",
    container: Container::WebM,
    video_codec: None,
    audio_codec: None,
};

impl EncoderNegotiation {
    /// Candidates in preference order; the other family is a degraded fallback
    pub fn candidates(format: OutputFormat) -> Vec<EncoderProfile> {
        match format {
            OutputFormat::Mp4 => vec![MP4_H264_AAC, MP4_PLAIN, WEBM_H264_OPUS, WEBM_PLAIN],
            OutputFormat::Webm => vec![
                WEBM_H264_OPUS,
                WEBM_VP9_OPUS,
                WEBM_PLAIN,
                MP4_H264_AAC,
                MP4_PLAIN,
            ],
        }
    }

    /// First candidate the runtime reports as supported
    pub fn select<F>(format: OutputFormat, is_supported: F) -> Option<EncoderProfile>
    where
        F: Fn(&EncoderProfile) -> bool,
    {
        Self::candidates(format).into_iter().find(|p| is_supported(p))
    }
}

/// Business rules for file naming
pub struct FileNaming;

impl FileNaming {
    /// Keep `[A-Za-z0-9._-]`, replace everything else with `_`
    pub fn sanitize(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Sanitized name with an extension appended when the name has none.
    /// Empty or dot-only names become `video.<ext>`.
    pub fn with_extension(name: &str, container: Container) -> String {
        let sanitized = Self::sanitize(name);
        if sanitized.trim_matches('.').is_empty() {
            return format!("video.{}", container.extension());
        }
        if sanitized.contains('.') {
            sanitized
        } else {
            format!("{}.{}", sanitized, container.extension())
        }
    }

    /// `clip_<number>_<title>.<ext>` with non-alphanumerics in the title replaced
    pub fn clip_filename(clip: &ClipSpec, extension: &str) -> String {
        let title = if clip.title.trim().is_empty() {
            "video".to_string()
        } else {
            clip.title
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect()
        };
        format!("clip_{}_{}.{}", clip.number, title, extension)
    }
}

/// Business rules for progress reporting
pub struct ProgressRules;

impl ProgressRules {
    /// Highest value reported while capturing; 100 is reserved for finalizing
    pub const CAPTURE_CEILING: f64 = 99.0;

    /// `clamp((pos - start) / (end - start) * 100, 0, 99)`
    pub fn capture_percent(position: f64, clip: &ClipSpec) -> f64 {
        let span = clip.end.seconds - clip.start.seconds;
        if span <= 0.0 || !position.is_finite() {
            return 0.0;
        }
        ((position - clip.start.seconds) / span * 100.0).clamp(0.0, Self::CAPTURE_CEILING)
    }

    /// Remaining time estimate from the average rate so far
    pub fn estimate_remaining(percent: f64, elapsed: Duration) -> EtaEstimate {
        let elapsed_secs = elapsed.as_secs_f64();
        if percent <= 0.0 || elapsed_secs < 1.0 {
            return EtaEstimate::Calculating;
        }

        let rate = percent / elapsed_secs;
        let remaining = (100.0 - percent) / rate;
        if remaining < 0.0 {
            return EtaEstimate::Finishing;
        }
        EtaEstimate::Remaining(Duration::from_secs_f64(remaining))
    }
}

/// Human-facing ETA
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EtaEstimate {
    Calculating,
    Finishing,
    Remaining(Duration),
}

impl fmt::Display for EtaEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtaEstimate::Calculating => write!(f, "Calculating..."),
            EtaEstimate::Finishing => write!(f, "Finishing..."),
            EtaEstimate::Remaining(duration) => {
                let secs = duration.as_secs_f64();
                if secs > 60.0 {
                    write!(f, "~{} mins left", (secs / 60.0).ceil() as u64)
                } else {
                    write!(f, "~{}s left", secs.ceil() as u64)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
