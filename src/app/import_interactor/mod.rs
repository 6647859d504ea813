// Import interactor - Orchestrates locator resolution, download and analysis

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::acquire::{direct_filename, BinaryAcquirer};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::locator::parse_locator;
use crate::ports::*;
use crate::resolver::{ProviderResolver, ResolveTarget};

/// Import stage markers reported before analysis starts
pub const STAGE_STARTED: f64 = 1.0;
pub const STAGE_RESOLVING: f64 = 2.0;
pub const STAGE_DOWNLOADING: f64 = 5.0;
/// Analysis progress is mapped onto `[ANALYSIS_BASE, 100]`
pub const ANALYSIS_BASE: f64 = 10.0;

/// Result of a remote import
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub locator: Locator,
    /// `None` for direct URLs that skipped resolution
    pub stream: Option<StreamDescriptor>,
    pub asset: MediaAsset,
}

/// Forwards progress, never letting it move backwards
struct MonotonicProgress<'a> {
    sink: ProgressFn<'a>,
    last: Mutex<f64>,
}

impl<'a> MonotonicProgress<'a> {
    fn new(sink: ProgressFn<'a>) -> Self {
        Self {
            sink,
            last: Mutex::new(0.0),
        }
    }

    fn report(&self, percent: f64) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let value = percent.clamp(0.0, 100.0);
        if value > *last {
            *last = value;
            (self.sink)(value);
        }
    }

    fn analysis(&self, percent: f64) {
        self.report(ANALYSIS_BASE + percent.clamp(0.0, 100.0) * (100.0 - ANALYSIS_BASE) / 100.0);
    }
}

/// Interactor for the import use case
pub struct ImportInteractor {
    resolver: Arc<ProviderResolver>,
    acquirer: Arc<BinaryAcquirer>,
    analysis: Option<Arc<dyn AnalysisPort>>,
}

impl ImportInteractor {
    pub fn new(
        resolver: Arc<ProviderResolver>,
        acquirer: Arc<BinaryAcquirer>,
        analysis: Option<Arc<dyn AnalysisPort>>,
    ) -> Self {
        Self {
            resolver,
            acquirer,
            analysis,
        }
    }

    /// Resolve a video-sharing locator to a stream descriptor
    pub async fn resolve(&self, raw: &str) -> Result<(Locator, StreamDescriptor), DomainError> {
        let locator = parse_locator(raw)?;
        let target = ResolveTarget::from_locator(&locator)?;
        info!(video_id = %target.video_id, canonical = %target.canonical_url, "Resolving stream");
        let stream = self.resolver.resolve(&target).await?;
        Ok((locator, stream))
    }

    /// Turn a remote locator into a validated in-memory asset
    pub async fn import(&self, raw: &str, on_progress: ProgressFn<'_>) -> Result<ImportOutcome, DomainError> {
        let progress = MonotonicProgress::new(on_progress);
        self.import_with(raw, &progress).await
    }

    async fn import_with(
        &self,
        raw: &str,
        progress: &MonotonicProgress<'_>,
    ) -> Result<ImportOutcome, DomainError> {
        progress.report(STAGE_STARTED);
        let locator = parse_locator(raw)?;

        let (stream, url, filename) = if locator.video_id.is_some() {
            progress.report(STAGE_RESOLVING);
            let target = ResolveTarget::from_locator(&locator)?;
            let stream = self.resolver.resolve(&target).await?;
            info!(provider = %stream.provider, filename = %stream.filename, "Stream resolved");
            let (url, filename) = (stream.url.clone(), stream.filename.clone());
            (Some(stream), url, filename)
        } else {
            let url = locator.canonical.clone();
            let filename = direct_filename(&url);
            (None, url, filename)
        };

        progress.report(STAGE_DOWNLOADING);
        let asset = match self.acquirer.acquire(&url, &filename).await {
            Ok(asset) => asset,
            Err(err) if stream.is_some() => {
                warn!(url = %url, "Download failed; the resolved stream can be fetched manually");
                return Err(err.with_manual_link(url));
            }
            Err(err) => return Err(err),
        };

        Ok(ImportOutcome {
            locator,
            stream,
            asset,
        })
    }

    /// Import, then hand the asset to the analysis collaborator
    pub async fn import_and_analyze(
        &self,
        raw: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<(ImportOutcome, AnalysisResult), DomainError> {
        let analysis = self.analysis_port()?;
        let progress = MonotonicProgress::new(on_progress);

        let outcome = self.import_with(raw, &progress).await?;
        progress.report(ANALYSIS_BASE);
        let result = analysis
            .analyze(&outcome.asset, &|p| progress.analysis(p))
            .await?;
        progress.report(100.0);
        Ok((outcome, result))
    }

    /// Analyze a local file, skipping resolution and download
    pub async fn analyze_local(
        &self,
        path: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<(MediaAsset, AnalysisResult), DomainError> {
        let analysis = self.analysis_port()?;
        let progress = MonotonicProgress::new(on_progress);

        let asset = self.acquirer.acquire_local(path).await?;
        progress.report(ANALYSIS_BASE);
        let result = analysis.analyze(&asset, &|p| progress.analysis(p)).await?;
        progress.report(100.0);
        Ok((asset, result))
    }

    fn analysis_port(&self) -> Result<Arc<dyn AnalysisPort>, DomainError> {
        self.analysis.clone().ok_or_else(|| {
            DomainError::Config("No analysis collaborator is configured".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_progress_never_decreases() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: f64| seen.lock().unwrap().push(p);
        let progress = MonotonicProgress::new(&sink);

        progress.report(STAGE_STARTED);
        progress.report(STAGE_DOWNLOADING);
        progress.report(STAGE_RESOLVING);
        progress.analysis(0.0);
        progress.analysis(50.0);
        progress.analysis(20.0);
        progress.analysis(100.0);

        assert_eq!(*seen.lock().unwrap(), vec![1.0, 5.0, 10.0, 55.0, 100.0]);
    }
}
