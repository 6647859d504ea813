//! Binary acquisition with size and content-type validation

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::FileNaming;
use crate::network::FallbackFetcher;
use crate::ports::{HttpRequest, HttpResponse};

const MIB: u64 = 1024 * 1024;

pub const DEFAULT_REMOTE_CEILING: u64 = 750 * MIB;
pub const DEFAULT_LOCAL_CEILING: u64 = 5 * 1024 * MIB;
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Filename used when a direct URL does not name a video file
pub const FALLBACK_FILENAME: &str = "imported_video.mp4";

/// Size ceilings for remote and local payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionLimits {
    pub remote_ceiling: u64,
    pub local_ceiling: u64,
}

impl Default for AcquisitionLimits {
    fn default() -> Self {
        Self {
            remote_ceiling: DEFAULT_REMOTE_CEILING,
            local_ceiling: DEFAULT_LOCAL_CEILING,
        }
    }
}

/// Last path segment when it names an `.mp4`/`.mov` file, else [`FALLBACK_FILENAME`]
pub fn direct_filename(url: &str) -> String {
    let without_query = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let last = without_query.rsplit('/').next().unwrap_or("");
    if last.contains(".mp4") || last.contains(".mov") {
        last.to_string()
    } else {
        FALLBACK_FILENAME.to_string()
    }
}

fn to_mib(bytes: u64) -> u64 {
    bytes / MIB
}

/// Check a downloaded response and turn it into a typed asset
pub fn validate_payload(
    response: HttpResponse,
    suggested_filename: &str,
    ceiling: u64,
) -> DomainResult<MediaAsset> {
    let observed = response
        .content_length
        .unwrap_or(0)
        .max(response.body.len() as u64);
    if response.body_limit_exceeded || observed > ceiling {
        let size = if response.body_limit_exceeded {
            format!("over {} MB", to_mib(ceiling))
        } else {
            format!("{} MB", to_mib(observed))
        };
        return Err(DomainError::validation(format!(
            "Video is too large for analysis ({}, limit {} MB).",
            size,
            to_mib(ceiling)
        )));
    }
    if response.body.is_empty() {
        return Err(DomainError::validation(
            "Download returned no video data. The video link might be expired or blocking access.",
        ));
    }

    let declared = response.content_type.clone();
    let lowered = declared.as_deref().unwrap_or("").to_ascii_lowercase();
    if lowered.contains("text") || lowered.contains("html") {
        return Err(DomainError::validation(
            "Proxy returned invalid data (HTML/Text). The video link might be expired or blocking access.",
        ));
    }

    let content_type = match declared.as_deref() {
        Some(ct) if lowered.contains("video") => ct.to_string(),
        _ => Container::Mp4.content_type().to_string(),
    };
    let container = Container::from_content_type(&content_type);
    let filename = FileNaming::with_extension(suggested_filename, container);
    let size = response.body.len() as u64;

    Ok(MediaAsset {
        bytes: response.body,
        size,
        declared_content_type: declared,
        content_type,
        container,
        filename,
    })
}

pub struct BinaryAcquirer {
    fetcher: FallbackFetcher,
    limits: AcquisitionLimits,
    download_timeout: Duration,
}

impl BinaryAcquirer {
    pub fn new(fetcher: FallbackFetcher, limits: AcquisitionLimits, download_timeout: Duration) -> Self {
        Self {
            fetcher,
            limits,
            download_timeout,
        }
    }

    pub fn limits(&self) -> AcquisitionLimits {
        self.limits
    }

    /// Download `stream_url` through the fallback chain and validate it
    pub async fn acquire(&self, stream_url: &str, suggested_filename: &str) -> DomainResult<MediaAsset> {
        let request = HttpRequest::get(stream_url).with_body_limit(self.limits.remote_ceiling);
        let outcome = self
            .fetcher
            .fetch_with_timeout(&request, self.download_timeout)
            .await
            .map_err(|e| match e {
                DomainError::Network(reason) => DomainError::Network(format!(
                    "Failed to download video data. {}",
                    reason
                )),
                other => other,
            })?;

        let asset = validate_payload(outcome.response, suggested_filename, self.limits.remote_ceiling)?;
        info!(
            filename = %asset.filename,
            size = asset.size,
            content_type = %asset.content_type,
            via = %outcome.strategy,
            "Video downloaded"
        );
        Ok(asset)
    }

    /// Read a local file under the local ceiling
    pub async fn acquire_local(&self, path: &Path) -> DomainResult<MediaAsset> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            DomainError::LocalFile(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::LocalFile(format!("'{}' is not a file", path.display())));
        }
        if metadata.len() > self.limits.local_ceiling {
            return Err(DomainError::validation(format!(
                "'{}' is {} MB, over the {} MB local limit.",
                path.display(),
                to_mib(metadata.len()),
                to_mib(self.limits.local_ceiling)
            )));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let container = Container::from_extension(extension).unwrap_or_else(|| {
            warn!(path = %path.display(), "Unrecognized extension, assuming mp4");
            Container::Mp4
        });

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(FALLBACK_FILENAME);

        Ok(MediaAsset {
            size: bytes.len() as u64,
            bytes,
            declared_content_type: None,
            content_type: container.content_type().to_string(),
            container,
            filename: FileNaming::with_extension(name, container),
        })
    }
}
