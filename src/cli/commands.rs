//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::{AppConfig, FfmpegEncoderAdapter, FfmpegPlaybackAdapter};
use crate::app::{AppContainer, DefaultAppContainer, ExportInteractor};
use crate::cli::args::{ExportArgs, FetchArgs, ResolveArgs};
use crate::cli::Commands;
use crate::domain::model::{ClipSpec, TimeSpec};
use crate::engine::{
    CancelSignal, ConsoleProgressCallback, JsonProgressCallback, ProgressCallback,
};
use crate::utils::format_file_size;

/// Dispatch a parsed command
pub async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Resolve(args) => resolve(args, config).await,
        Commands::Fetch(args) => fetch(args, config).await,
        Commands::Export(args) => export(args, config).await,
    }
}

/// Execute the resolve command
pub async fn resolve(args: ResolveArgs, config: &AppConfig) -> Result<()> {
    let container = DefaultAppContainer::from_config(config, Vec::new())?;
    let (locator, stream) = container
        .import_interactor()
        .resolve(&args.locator)
        .await?;

    if args.json {
        let doc = json!({ "locator": locator, "stream": stream });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("Provider: {}", stream.provider);
        println!("Filename: {}", stream.filename);
        println!("Muxed:    {}", if stream.muxed { "yes" } else { "no (video only)" });
        println!("URL:      {}", stream.url);
    }
    Ok(())
}

/// Execute the fetch command
pub async fn fetch(args: FetchArgs, config: &AppConfig) -> Result<()> {
    let container = DefaultAppContainer::from_config(config, Vec::new())?;
    let on_progress = |percent: f64| info!(percent, "Import progress");
    let outcome = container
        .import_interactor()
        .import(&args.locator, &on_progress)
        .await?;

    let dir = &config.export.output_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(&outcome.asset.filename);
    tokio::fs::write(&path, &outcome.asset.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if args.json {
        let doc = json!({
            "path": path,
            "size": outcome.asset.size,
            "content_type": outcome.asset.content_type,
            "stream": outcome.stream,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!(
            "Saved {} ({})",
            path.display(),
            format_file_size(outcome.asset.size)
        );
    }
    Ok(())
}

async fn clip_for(args: &ExportArgs) -> Result<ClipSpec> {
    if let Some(analysis_path) = &args.analysis {
        let number = args
            .clip
            .context("--clip is required with --analysis")?;
        let analysis = ExportInteractor::load_analysis(analysis_path).await?;
        return Ok(ExportInteractor::clip_from_analysis(&analysis, number)?);
    }

    let (start, end) = match (&args.start, &args.end) {
        (Some(start), Some(end)) => (start, end),
        _ => anyhow::bail!("Either --start/--end or --analysis/--clip is required"),
    };
    let start = TimeSpec::parse(start).with_context(|| format!("Invalid start time '{}'", start))?;
    let end = TimeSpec::parse(end).with_context(|| format!("Invalid end time '{}'", end))?;
    let title = args.title.clone().unwrap_or_else(|| clip_title(&args.input));
    Ok(ClipSpec::new(args.clip.unwrap_or(1), title, start, end)?)
}

fn clip_title(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video")
        .to_string()
}

/// Ctrl-C flips the returned signal to `true`
fn cancel_on_ctrl_c() -> CancelSignal {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling export");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Execute the export command
pub async fn export(args: ExportArgs, config: &AppConfig) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }
    let clip = clip_for(&args).await?;
    let settings = config.export_settings()?;

    let callback: Arc<dyn ProgressCallback> = if args.json {
        Arc::new(JsonProgressCallback)
    } else {
        Arc::new(ConsoleProgressCallback::new())
    };
    let container = DefaultAppContainer::from_config(config, vec![callback])?;

    let mut source = FfmpegPlaybackAdapter::open(&args.input, settings.frame_rate)
        .await
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut sink = FfmpegEncoderAdapter::detect().await?;
    let duration = source.info().duration;
    if duration > 0.0 && clip.end.seconds > duration {
        warn!(
            end = clip.end.seconds,
            duration,
            "Clip ends after the source; capture stops at the end of the video"
        );
    }

    info!(
        clip = clip.number,
        start = %clip.start,
        end = %clip.end,
        format = ?settings.format,
        "Exporting clip"
    );
    let (path, artifact) = container
        .export_interactor()
        .export_to_dir(
            &mut source,
            &mut sink,
            &clip,
            &settings,
            &config.export.output_dir,
            Some(cancel_on_ctrl_c()),
        )
        .await?;

    if args.json {
        let doc = json!({
            "path": path,
            "clip": artifact.clip_number,
            "mime_type": artifact.mime_type,
            "size": artifact.bytes.len(),
            "has_audio": artifact.has_audio,
        });
        println!("{}", serde_json::to_string(&doc)?);
    } else {
        println!(
            "Exported clip {} to {} ({}, {})",
            artifact.clip_number,
            path.display(),
            artifact.mime_type,
            format_file_size(artifact.bytes.len() as u64)
        );
    }
    Ok(())
}
