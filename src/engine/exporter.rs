//! Clip export state machine: seek, negotiate, capture, finalize

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::compositor::FrameCompositor;
use super::job::{ExportSlot, JobLease};
use super::progress::{ProgressCallback, ProgressTracker};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{EncoderNegotiation, FileNaming, ProgressRules};
use crate::ports::{EncoderPort, FrameSignal, PlaybackPort, SinkConfig};

pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(10);

/// Receiver side of a cancellation signal; `true` means stop
pub type CancelSignal = watch::Receiver<bool>;

pub struct ClipExporter {
    slot: ExportSlot,
    seek_timeout: Duration,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
}

impl ClipExporter {
    pub fn new(slot: ExportSlot, seek_timeout: Duration) -> Self {
        Self {
            slot,
            seek_timeout,
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    pub fn slot(&self) -> &ExportSlot {
        &self.slot
    }

    /// Export one clip from `source` into `sink`.
    ///
    /// The clip is validated and the slot taken before anything touches the
    /// source. Any failure resets the slot without producing output.
    pub async fn export(
        &self,
        source: &mut dyn PlaybackPort,
        sink: &mut dyn EncoderPort,
        clip: &ClipSpec,
        settings: &ExportSettings,
        cancel: Option<CancelSignal>,
    ) -> DomainResult<ExportArtifact> {
        clip.validate()?;
        let lease = self.slot.try_begin(clip.number)?;

        let tracker = ProgressTracker::new(clip.number);
        for callback in &self.callbacks {
            tracker.add_callback(callback.clone());
        }
        tracker.set_state(ExportState::Seeking);

        info!(clip = clip.number, start = %clip.start, end = %clip.end, "Starting export");
        let mut cancel = cancel;
        match self
            .run(&lease, &tracker, source, sink, clip, settings, &mut cancel)
            .await
        {
            Ok(artifact) => {
                lease.transition(ExportState::Done);
                tracker.finish(&artifact.filename);
                info!(clip = clip.number, filename = %artifact.filename, bytes = artifact.bytes.len(), "Export finished");
                Ok(artifact)
            }
            Err(e) => {
                lease.transition(ExportState::Failed);
                sink.abort().await;
                source.pause();
                tracker.fail(&e);
                warn!(clip = clip.number, error = %e, "Export failed");
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        lease: &JobLease,
        tracker: &ProgressTracker,
        source: &mut dyn PlaybackPort,
        sink: &mut dyn EncoderPort,
        clip: &ClipSpec,
        settings: &ExportSettings,
        cancel: &mut Option<CancelSignal>,
    ) -> DomainResult<ExportArtifact> {
        source.set_volume(0.0);

        tokio::select! {
            biased;
            _ = cancelled(cancel) => return Err(DomainError::Cancelled),
            sought = seek_to(source, clip.start.seconds, self.seek_timeout) => sought?,
        }

        let profile = EncoderNegotiation::select(settings.format, |p| sink.is_type_supported(p))
            .ok_or_else(|| {
                DomainError::PlatformUnsupported(
                    "No supported video encoder configuration was found.".to_string(),
                )
            })?;
        debug!(mime = profile.mime_type, "Negotiated encoder profile");

        let audio = match source.capture_audio_track() {
            Ok(Some(track)) => Some(track),
            Ok(None) => {
                warn!(clip = clip.number, "Source has no audio track; exporting video only");
                None
            }
            Err(e) => {
                warn!(clip = clip.number, error = %e, "Audio capture unavailable; exporting video only");
                None
            }
        };
        let has_audio = audio.is_some();

        let compositor = FrameCompositor::for_output(settings.aspect, settings.quality);
        let (width, height) = compositor.output_size();
        let (src_w, src_h) = source.dimensions();
        debug!(
            source = %format!("{}x{}", src_w, src_h),
            output = %format!("{}x{}", width, height),
            "Compositing frames"
        );
        let config = SinkConfig {
            profile,
            width,
            height,
            frame_rate: settings.frame_rate,
            video_bitrate: settings.quality.video_bitrate(),
            audio,
        };
        sink.start(&config).await?;
        source.play().await.map_err(into_playback)?;

        lease.transition(ExportState::Capturing);
        tracker.start();

        let signal = source.frame_signal();
        let mut ticker = frame_ticker(settings.frame_rate);
        let mut frames = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Err(DomainError::Cancelled),
                waited = next_frame(source, &mut ticker, signal) => waited.map_err(into_playback)?,
            }

            let position = source.current_time();
            if position >= clip.end.seconds || source.is_ended() || source.is_paused() {
                break;
            }

            if let Some(frame) = source.current_frame() {
                let composed = compositor.composite(frame);
                sink.write_frame(&composed).await?;
                frames += 1;
            }

            tracker.update(ProgressRules::capture_percent(position, clip));
            lease.set_percent(tracker.percent());
        }

        lease.transition(ExportState::Finalizing);
        tracker.set_state(ExportState::Finalizing);
        let chunks = sink.stop().await?;
        source.pause();
        debug!(clip = clip.number, frames, chunks = chunks.len(), "Capture stopped");

        let bytes = chunks.concat();
        if bytes.is_empty() {
            return Err(DomainError::Encoder("Encoder produced no data".to_string()));
        }

        tracker.complete();
        lease.set_percent(100.0);

        Ok(ExportArtifact {
            clip_number: clip.number,
            filename: FileNaming::clip_filename(clip, profile.extension()),
            mime_type: profile.mime_type.to_string(),
            bytes,
            profile,
            has_audio,
        })
    }
}

fn into_playback(err: DomainError) -> DomainError {
    match err {
        DomainError::Playback(_) | DomainError::Cancelled => err,
        other => DomainError::Playback(other.to_string()),
    }
}

/// Seek and wait for buffered data, bounded by `limit`
async fn seek_to(source: &mut dyn PlaybackPort, position: f64, limit: Duration) -> DomainResult<()> {
    let wait = async {
        source.seek(position).await?;
        if !source.has_current_data() {
            source.wait_for_data().await?;
        }
        Ok::<(), DomainError>(())
    };

    match tokio::time::timeout(limit, wait).await {
        Ok(result) => result.map_err(into_playback),
        Err(_) => Err(DomainError::Playback(format!(
            "Timed out after {:?} seeking to {:.3}s",
            limit, position
        ))),
    }
}

fn frame_ticker(frame_rate: u32) -> Interval {
    let period = Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_frame(
    source: &mut dyn PlaybackPort,
    ticker: &mut Interval,
    signal: FrameSignal,
) -> DomainResult<()> {
    match signal {
        FrameSignal::Presented => source.wait_presented_frame().await,
        FrameSignal::Timer => {
            ticker.tick().await;
            Ok(())
        }
    }
}

/// Resolves once the signal reads `true`; never resolves without a signal
async fn cancelled(cancel: &mut Option<CancelSignal>) {
    match cancel {
        Some(rx) => loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending::<()>().await,
    }
}
