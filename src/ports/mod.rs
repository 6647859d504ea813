// Ports - Interface definitions (contracts)

use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbImage;

use crate::domain::errors::*;
use crate::domain::model::*;

/// HTTP method; decides which proxy transforms are eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post)
    }
}

/// Outgoing request handed to an [`HttpPort`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Stop buffering the body past this many bytes
    pub max_body_bytes: Option<u64>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            max_body_bytes: None,
        }
    }

    /// POST with a JSON body and JSON accept/content-type headers
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(body.to_string().into_bytes()),
            max_body_bytes: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Same request aimed at another URL
    pub fn retarget(&self, url: String) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }
}

/// Response as seen by the fallback layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Declared Content-Length, if any
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
    /// Body was not fully buffered because it exceeded the request limit
    pub body_limit_exceeded: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| DomainError::Network(format!("Invalid JSON response: {}", e)))
    }
}

/// Port for issuing HTTP requests
#[async_trait]
pub trait HttpPort: Send + Sync {
    /// Send one request; non-success statuses are returned, not raised
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, DomainError>;
}

/// Port for drawing instance samples
pub trait InstanceSampler: Send + Sync {
    /// Up to `max` distinct entries of `pool`, in the order they should be tried
    fn sample(&self, pool: &[String], max: usize) -> Vec<String>;
}

/// How the capture loop learns that a new frame is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// Precise notification per presented frame
    Presented,
    /// No per-frame notification; poll at the export frame rate
    Timer,
}

/// Capturable audio track of a bound source
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub label: String,
    /// File the track can be read from, for process-based sinks
    pub source_path: Option<PathBuf>,
    /// Source position the track starts at
    pub start_offset: f64,
}

/// Port for a playable, seekable video source
#[async_trait]
pub trait PlaybackPort: Send {
    /// Output volume; the audio track stays capturable at zero
    fn set_volume(&mut self, volume: f32);

    /// Request a position; resolves once the seek-complete signal fired
    async fn seek(&mut self, position: f64) -> Result<(), DomainError>;

    /// Whether data for the current position is buffered
    fn has_current_data(&self) -> bool;

    /// Resolves once data for the current position is buffered
    async fn wait_for_data(&mut self) -> Result<(), DomainError>;

    /// Audio track to pass through, `None` when the source has none
    fn capture_audio_track(&mut self) -> Result<Option<AudioTrack>, DomainError>;

    async fn play(&mut self) -> Result<(), DomainError>;

    fn pause(&mut self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    fn is_ended(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Decoded dimensions (width, height)
    fn dimensions(&self) -> (u32, u32);

    fn frame_signal(&self) -> FrameSignal;

    /// Resolves when the next frame is presented; only used with [`FrameSignal::Presented`]
    async fn wait_presented_frame(&mut self) -> Result<(), DomainError>;

    /// Frame at the current position
    fn current_frame(&self) -> Option<&RgbImage>;
}

/// Encoder sink configuration negotiated before capture
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub profile: EncoderProfile,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub video_bitrate: u64,
    pub audio: Option<AudioTrack>,
}

/// Port for the media encoder sink
#[async_trait]
pub trait EncoderPort: Send {
    /// Whether this runtime can record the given profile
    fn is_type_supported(&self, profile: &EncoderProfile) -> bool;

    async fn start(&mut self, config: &SinkConfig) -> Result<(), DomainError>;

    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), DomainError>;

    /// Stop recording and hand back every buffered chunk in order
    async fn stop(&mut self) -> Result<Vec<Vec<u8>>, DomainError>;

    /// Stop recording and discard everything
    async fn abort(&mut self);
}

/// Progress callback used by long-running collaborators, values in `[0, 100]`
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Port for the external content-analysis collaborator
#[async_trait]
pub trait AnalysisPort: Send + Sync {
    async fn analyze(
        &self,
        asset: &MediaAsset,
        on_progress: ProgressFn<'_>,
    ) -> Result<AnalysisResult, DomainError>;
}
