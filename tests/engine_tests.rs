//! Clip export engine tests against in-memory playback and encoder fakes

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tokio::sync::watch;
use tokio::time::Instant;

use reelx_cli::domain::errors::DomainError;
use reelx_cli::domain::model::*;
use reelx_cli::engine::{ClipExporter, ExportProgress, ExportSlot, ProgressCallback};
use reelx_cli::ports::*;

// Test utilities

struct FakeSource {
    frame: RgbImage,
    position: f64,
    /// Seconds advanced per presented frame
    step: f64,
    signal: FrameSignal,
    played_at: Option<Instant>,
    seek_hangs: bool,
    audio: bool,
    seeks: usize,
    paused: bool,
    volume: f32,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            frame: RgbImage::from_pixel(64, 36, Rgb([200, 40, 40])),
            position: 0.0,
            step: 5.0,
            signal: FrameSignal::Presented,
            played_at: None,
            seek_hangs: false,
            audio: true,
            seeks: 0,
            paused: true,
            volume: 1.0,
        }
    }
}

#[async_trait]
impl PlaybackPort for FakeSource {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    async fn seek(&mut self, position: f64) -> Result<(), DomainError> {
        self.seeks += 1;
        if self.seek_hangs {
            std::future::pending::<()>().await;
        }
        self.position = position;
        Ok(())
    }

    fn has_current_data(&self) -> bool {
        !self.seek_hangs
    }

    async fn wait_for_data(&mut self) -> Result<(), DomainError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn capture_audio_track(&mut self) -> Result<Option<AudioTrack>, DomainError> {
        Ok(self.audio.then(|| AudioTrack {
            label: "fake".to_string(),
            source_path: Some(PathBuf::from("fake.mp4")),
            start_offset: self.position,
        }))
    }

    async fn play(&mut self) -> Result<(), DomainError> {
        self.paused = false;
        self.played_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.played_at = None;
        self.paused = true;
    }

    fn current_time(&self) -> f64 {
        match (self.signal, self.played_at) {
            (FrameSignal::Timer, Some(at)) => self.position + at.elapsed().as_secs_f64(),
            _ => self.position,
        }
    }

    fn is_ended(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn frame_signal(&self) -> FrameSignal {
        self.signal
    }

    async fn wait_presented_frame(&mut self) -> Result<(), DomainError> {
        self.position += self.step;
        Ok(())
    }

    fn current_frame(&self) -> Option<&RgbImage> {
        Some(&self.frame)
    }
}

struct FakeSink {
    supported: Vec<&'static str>,
    config: Option<SinkConfig>,
    frames: usize,
    frame_size: Option<(u32, u32)>,
    output: Vec<Vec<u8>>,
    stopped: bool,
    aborted: bool,
}

impl FakeSink {
    fn supporting(supported: &[&'static str]) -> Self {
        Self {
            supported: supported.to_vec(),
            config: None,
            frames: 0,
            frame_size: None,
            output: vec![b"moof".to_vec(), b"mdat".to_vec()],
            stopped: false,
            aborted: false,
        }
    }
}

#[async_trait]
impl EncoderPort for FakeSink {
    fn is_type_supported(&self, profile: &EncoderProfile) -> bool {
        self.supported.contains(&profile.mime_type)
    }

    async fn start(&mut self, config: &SinkConfig) -> Result<(), DomainError> {
        self.config = Some(config.clone());
        Ok(())
    }

    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), DomainError> {
        self.frames += 1;
        self.frame_size = Some(frame.dimensions());
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<Vec<u8>>, DomainError> {
        self.stopped = true;
        Ok(std::mem::take(&mut self.output))
    }

    async fn abort(&mut self) {
        self.aborted = true;
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ExportProgress>>,
    completed: Mutex<Vec<String>>,
    cancel_at: Option<(f64, watch::Sender<bool>)>,
}

impl Recorder {
    fn percents(&self) -> Vec<f64> {
        self.events.lock().unwrap().iter().map(|e| e.percent).collect()
    }
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, progress: &ExportProgress) {
        self.events.lock().unwrap().push(progress.clone());
        if let Some((threshold, tx)) = &self.cancel_at {
            if progress.percent >= *threshold {
                let _ = tx.send(true);
            }
        }
    }

    fn on_complete(&self, filename: &str) {
        self.completed.lock().unwrap().push(filename.to_string());
    }
}

const MP4: &str = "video/mp4;codecs=h264,aac";

fn clip(number: u32, start: f64, end: f64) -> ClipSpec {
    ClipSpec::new(
        number,
        "Hook: the start!",
        TimeSpec::from_seconds(start),
        TimeSpec::from_seconds(end),
    )
    .unwrap()
}

fn exporter_with(recorder: Arc<Recorder>) -> ClipExporter {
    let mut exporter = ClipExporter::new(ExportSlot::new(), Duration::from_secs(10));
    exporter.add_callback(recorder);
    exporter
}

// Tests

#[tokio::test]
async fn test_progress_starts_at_zero_and_reaches_100_once() {
    let recorder = Arc::new(Recorder::default());
    let exporter = exporter_with(recorder.clone());
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[MP4]);

    exporter
        .export(&mut source, &mut sink, &clip(1, 10.0, 40.0), &ExportSettings::default(), None)
        .await
        .unwrap();

    let percents = recorder.percents();
    assert_eq!(percents.first(), Some(&0.0));
    assert_eq!(percents.last(), Some(&100.0));
    assert_eq!(percents.iter().filter(|p| **p >= 100.0).count(), 1);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents[..percents.len() - 1].iter().all(|p| *p < 100.0));
}

#[tokio::test]
async fn test_export_builds_named_artifact_from_chunks() {
    let recorder = Arc::new(Recorder::default());
    let exporter = exporter_with(recorder.clone());
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[MP4]);

    let artifact = exporter
        .export(&mut source, &mut sink, &clip(3, 10.0, 40.0), &ExportSettings::default(), None)
        .await
        .unwrap();

    assert_eq!(artifact.filename, "clip_3_Hook__the_start_.mp4");
    assert_eq!(artifact.mime_type, MP4);
    assert_eq!(artifact.bytes, b"moofmdat".to_vec());
    assert!(artifact.has_audio);
    assert_eq!(*recorder.completed.lock().unwrap(), vec![artifact.filename.clone()]);

    // positions 15, 20, 25, 30, 35 are captured; 40 ends the loop
    assert_eq!(sink.frames, 5);
    assert_eq!(sink.frame_size, Some((720, 1280)));
    let config = sink.config.unwrap();
    assert_eq!((config.width, config.height), (720, 1280));
    assert_eq!(config.video_bitrate, 2_500_000);
    assert_eq!(config.audio.unwrap().start_offset, 10.0);

    assert_eq!(source.volume, 0.0);
    assert!(source.is_paused());
    assert!(!exporter.slot().is_busy());
}

#[tokio::test]
async fn test_missing_audio_exports_video_only() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let mut source = FakeSource::new();
    source.audio = false;
    let mut sink = FakeSink::supporting(&[MP4]);

    let artifact = exporter
        .export(&mut source, &mut sink, &clip(1, 0.0, 10.0), &ExportSettings::default(), None)
        .await
        .unwrap();

    assert!(!artifact.has_audio);
    assert!(sink.config.unwrap().audio.is_none());
}

#[tokio::test]
async fn test_webm_request_falls_back_to_first_supported_candidate() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&["video/webm;codecs=vp9,opus", MP4]);
    let settings = ExportSettings {
        format: OutputFormat::Webm,
        ..ExportSettings::default()
    };

    let artifact = exporter
        .export(&mut source, &mut sink, &clip(2, 0.0, 10.0), &settings, None)
        .await
        .unwrap();

    assert_eq!(artifact.mime_type, "video/webm;codecs=vp9,opus");
    assert!(artifact.filename.ends_with(".webm"));
}

#[tokio::test]
async fn test_second_export_is_refused_while_one_is_active() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let _active = exporter.slot().try_begin(7).unwrap();
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[MP4]);

    let err = exporter
        .export(&mut source, &mut sink, &clip(8, 0.0, 10.0), &ExportSettings::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::ExportBusy { active_clip: 7 }));
    assert_eq!(source.seeks, 0);
    assert_eq!(exporter.slot().status().clip_number, Some(7));
}

#[tokio::test]
async fn test_invalid_clip_is_rejected_before_seeking() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[MP4]);
    let backwards = ClipSpec {
        number: 1,
        title: "x".to_string(),
        start: TimeSpec::from_seconds(40.0),
        end: TimeSpec::from_seconds(10.0),
    };

    let err = exporter
        .export(&mut source, &mut sink, &backwards, &ExportSettings::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::InvalidClip(_)));
    assert_eq!(source.seeks, 0);
    assert!(!exporter.slot().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_seek_that_never_completes_times_out() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let mut source = FakeSource::new();
    source.seek_hangs = true;
    let mut sink = FakeSink::supporting(&[MP4]);

    let err = exporter
        .export(&mut source, &mut sink, &clip(1, 10.0, 40.0), &ExportSettings::default(), None)
        .await
        .unwrap_err();

    match err {
        DomainError::Playback(message) => assert!(message.contains("Timed out")),
        other => panic!("expected playback error, got {other:?}"),
    }
    assert!(sink.config.is_none());
    assert!(!exporter.slot().is_busy());
}

#[tokio::test]
async fn test_no_supported_encoder_fails_before_capture() {
    let recorder = Arc::new(Recorder::default());
    let exporter = exporter_with(recorder.clone());
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[]);

    let err = exporter
        .export(&mut source, &mut sink, &clip(1, 10.0, 40.0), &ExportSettings::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::PlatformUnsupported(_)));
    assert!(sink.config.is_none());
    assert_eq!(sink.frames, 0);
    assert!(recorder.percents().is_empty());
    assert!(!exporter.slot().is_busy());
}

#[tokio::test]
async fn test_cancellation_discards_output_and_frees_the_slot() {
    let (tx, rx) = watch::channel(false);
    let recorder = Arc::new(Recorder {
        cancel_at: Some((30.0, tx)),
        ..Recorder::default()
    });
    let exporter = exporter_with(recorder.clone());
    let mut source = FakeSource::new();
    source.step = 1.0;
    let mut sink = FakeSink::supporting(&[MP4]);

    let err = exporter
        .export(&mut source, &mut sink, &clip(1, 10.0, 40.0), &ExportSettings::default(), Some(rx))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Cancelled));
    assert!(sink.aborted);
    assert!(!sink.stopped);
    assert!(source.is_paused());
    assert!(!recorder.percents().contains(&100.0));
    assert!(recorder.completed.lock().unwrap().is_empty());
    assert!(!exporter.slot().is_busy());
}

#[tokio::test]
async fn test_empty_encoder_output_is_an_error() {
    let exporter = exporter_with(Arc::new(Recorder::default()));
    let mut source = FakeSource::new();
    let mut sink = FakeSink::supporting(&[MP4]);
    sink.output.clear();

    let err = exporter
        .export(&mut source, &mut sink, &clip(1, 0.0, 10.0), &ExportSettings::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Encoder(_)));
    assert!(!exporter.slot().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_timer_driven_capture_without_frame_signal() {
    let recorder = Arc::new(Recorder::default());
    let exporter = exporter_with(recorder.clone());
    let mut source = FakeSource::new();
    source.signal = FrameSignal::Timer;
    let mut sink = FakeSink::supporting(&[MP4]);
    let settings = ExportSettings {
        frame_rate: 2,
        ..ExportSettings::default()
    };

    let artifact = exporter
        .export(&mut source, &mut sink, &clip(1, 0.0, 2.0), &settings, None)
        .await
        .unwrap();

    assert_eq!(artifact.bytes, b"moofmdat".to_vec());
    assert!(sink.frames >= 3 && sink.frames <= 5, "frames = {}", sink.frames);
    assert_eq!(recorder.percents().last(), Some(&100.0));
}
