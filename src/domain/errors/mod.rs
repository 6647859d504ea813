// Domain errors - Error types for the domain layer

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::domain::model::ResolutionAttempt;

/// Hint appended to acquisition failures that a local file would avoid.
pub const MANUAL_UPLOAD_HINT: &str =
    "Download the video manually and pass it with `--input` (local files up to 5 GB are supported).";

/// Classification of analysis collaborator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    /// Malformed or unsupported input (corrupt file, unsupported format)
    InvalidInput,
    /// Anything else, possibly transient
    Unknown,
}

impl fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisErrorKind::InvalidInput => write!(f, "invalid input"),
            AnalysisErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Domain-specific error types
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Locator not recognized or identifier unrecoverable
    #[error("Unrecognized video locator: {0}")]
    Locator(String),

    /// Every provider and sampled instance failed
    #[error("{}", summarize_attempts(.attempts))]
    ResolutionExhausted { attempts: Vec<ResolutionAttempt> },

    /// A fallback chain was fully exhausted for one fetch
    #[error("Network error: {0}")]
    Network(String),

    /// Oversized payload or non-media content
    #[error("{message} {}", MANUAL_UPLOAD_HINT)]
    Validation { message: String },

    /// Download failed after resolution; the stream URL can still be fetched by hand
    #[error("{cause} Manual download link: {stream_url}")]
    ManualDownload {
        stream_url: String,
        cause: Box<DomainError>,
    },

    /// Local file unreadable or not a regular file
    #[error("Local file rejected: {0}")]
    LocalFile(String),

    /// No encoder configuration available for the requested format
    #[error("Platform unsupported: {0}")]
    PlatformUnsupported(String),

    /// Seek or playback failed mid-job
    #[error("Playback error: {0}")]
    Playback(String),

    /// Failure surfaced by the analysis collaborator
    #[error("Analysis failed ({kind}): {message}")]
    Analysis {
        kind: AnalysisErrorKind,
        message: String,
    },

    /// Clip boundaries violate `0 <= start < end`
    #[error("Invalid clip: {0}")]
    InvalidClip(String),

    /// Another export job is active
    #[error("An export is already in progress (clip {active_clip}); wait for it to finish")]
    ExportBusy { active_clip: u32 },

    /// Export stopped by the user
    #[error("Export cancelled; no file was written")]
    Cancelled,

    /// Encoder sink failure
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl DomainError {
    /// Build a validation error from a message
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
        }
    }

    /// Attach the resolved stream URL to a download failure
    pub fn with_manual_link(self, stream_url: impl Into<String>) -> Self {
        match self {
            DomainError::Network(_) | DomainError::Validation { .. } => DomainError::ManualDownload {
                stream_url: stream_url.into(),
                cause: Box::new(self),
            },
            other => other,
        }
    }

    /// Full attempt list for diagnostics, empty for every other variant
    pub fn attempts(&self) -> &[ResolutionAttempt] {
        match self {
            DomainError::ResolutionExhausted { attempts } => attempts,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// Condensed user-facing summary: provider names, deduplicated, in first-seen order.
pub fn summarize_attempts(attempts: &[ResolutionAttempt]) -> String {
    let mut seen = BTreeSet::new();
    let providers: Vec<&str> = attempts
        .iter()
        .filter(|attempt| seen.insert(attempt.provider.as_str()))
        .map(|attempt| attempt.provider.as_str())
        .collect();

    let tried = if providers.is_empty() {
        "None".to_string()
    } else {
        providers.join(", ")
    };
    format!(
        "Could not resolve video stream. Providers tried: {}. Detailed errors are in the log.",
        tried
    )
}

/// Result alias for domain operations
pub type DomainResult<T> = std::result::Result<T, DomainError>;
