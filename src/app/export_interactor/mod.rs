// Export interactor - Runs a clip export and writes the artifact to disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{CancelSignal, ClipExporter};
use crate::ports::*;

/// Interactor for the export use case
pub struct ExportInteractor {
    exporter: Arc<ClipExporter>,
}

impl ExportInteractor {
    pub fn new(exporter: Arc<ClipExporter>) -> Self {
        Self { exporter }
    }

    pub fn exporter(&self) -> &ClipExporter {
        &self.exporter
    }

    /// Export `clip` and write it under `output_dir`, returning the written path
    pub async fn export_to_dir(
        &self,
        source: &mut dyn PlaybackPort,
        sink: &mut dyn EncoderPort,
        clip: &ClipSpec,
        settings: &ExportSettings,
        output_dir: &Path,
        cancel: Option<CancelSignal>,
    ) -> Result<(PathBuf, ExportArtifact), DomainError> {
        let artifact = self
            .exporter
            .export(source, sink, clip, settings, cancel)
            .await?;

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(&artifact.filename);
        tokio::fs::write(&path, &artifact.bytes).await?;
        info!(path = %path.display(), mime = %artifact.mime_type, "Clip written");
        Ok((path, artifact))
    }

    /// Read an analysis document previously produced for the source
    pub async fn load_analysis(path: &Path) -> Result<AnalysisResult, DomainError> {
        let content = tokio::fs::read(path).await?;
        serde_json::from_slice(&content).map_err(|e| {
            DomainError::Config(format!(
                "Invalid analysis document '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Clip `number` from the analysis catalog
    pub fn clip_from_analysis(analysis: &AnalysisResult, number: u32) -> Result<ClipSpec, DomainError> {
        let entry = analysis.clip(number).ok_or_else(|| {
            DomainError::InvalidClip(format!("Clip {} is not in the analysis catalog", number))
        })?;
        ClipSpec::from_catalog(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "clip_catalog": [
            { "clip_number": 2, "title": "Hook", "start_time": "00:10", "end_time": "00:40" },
            { "clip_number": 5, "title": "Backwards", "start_time": "01:00", "end_time": "00:30" }
        ],
        "top_10_clips": [2]
    }"#;

    #[tokio::test]
    async fn test_clip_loaded_from_analysis_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, DOCUMENT).unwrap();

        let analysis = ExportInteractor::load_analysis(&path).await.unwrap();
        let clip = ExportInteractor::clip_from_analysis(&analysis, 2).unwrap();

        assert_eq!(clip.number, 2);
        assert_eq!(clip.title, "Hook");
        assert_eq!(clip.start.seconds, 10.0);
        assert_eq!(clip.end.seconds, 40.0);
    }

    #[test]
    fn test_missing_or_inverted_catalog_clip_is_rejected() {
        let analysis: AnalysisResult = serde_json::from_str(DOCUMENT).unwrap();

        assert!(matches!(
            ExportInteractor::clip_from_analysis(&analysis, 9),
            Err(DomainError::InvalidClip(_))
        ));
        assert!(matches!(
            ExportInteractor::clip_from_analysis(&analysis, 5),
            Err(DomainError::InvalidClip(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_analysis_document_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            ExportInteractor::load_analysis(&path).await,
            Err(DomainError::Config(_))
        ));
    }
}
