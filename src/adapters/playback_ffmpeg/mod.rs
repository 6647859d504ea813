//! FFmpeg decode adapter acting as a seekable playback source
//!
//! Frames are decoded by an `ffmpeg` child process into raw RGB on stdout.
//! A frame counts as presented when it has been read off the pipe.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use super::probe_ffprobe::{FfprobeAdapter, SourceInfo};
use crate::domain::errors::*;
use crate::ports::*;

pub struct FfmpegPlaybackAdapter {
    binary: PathBuf,
    path: PathBuf,
    info: SourceInfo,
    frame_rate: u32,
    decoder: Option<Child>,
    stdout: Option<ChildStdout>,
    frame: Option<RgbImage>,
    seek_base: f64,
    frames_read: u64,
    position: f64,
    /// The frame decoded by the seek has not been handed out yet
    initial_pending: bool,
    paused: bool,
    ended: bool,
}

impl FfmpegPlaybackAdapter {
    /// Probe `path` and prepare a decoder at the given output frame rate
    pub async fn open(path: &Path, frame_rate: u32) -> Result<Self, DomainError> {
        let binary = which::which("ffmpeg").map_err(|_| {
            DomainError::PlatformUnsupported("ffmpeg was not found on PATH".to_string())
        })?;
        let info = FfprobeAdapter::new()?.probe(path).await?;
        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            duration = info.duration,
            has_audio = info.has_audio,
            "Probed source"
        );

        Ok(Self {
            binary,
            path: path.to_path_buf(),
            info,
            frame_rate: frame_rate.max(1),
            decoder: None,
            stdout: None,
            frame: None,
            seek_base: 0.0,
            frames_read: 0,
            position: 0.0,
            initial_pending: false,
            paused: true,
            ended: false,
        })
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }

    fn stop_decoder(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.decoder.take() {
            let _ = child.start_kill();
        }
    }

    fn spawn_decoder(&mut self, position: f64) -> Result<(), DomainError> {
        self.stop_decoder();

        let filter = format!(
            "fps={},scale={}:{}",
            self.frame_rate, self.info.width, self.info.height
        );
        let mut child = Command::new(&self.binary)
            .args(["-hide_banner", "-v", "error", "-ss"])
            .arg(format!("{:.3}", position))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-sn", "-vf"])
            .arg(filter)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::Playback(format!("Failed to start ffmpeg decoder: {}", e)))?;

        self.stdout = child.stdout.take();
        self.decoder = Some(child);
        Ok(())
    }

    /// Read one frame; `Ok(false)` at end of stream
    async fn read_frame(&mut self) -> Result<bool, DomainError> {
        let len = self.frame_len();
        let stdout = match self.stdout.as_mut() {
            Some(stdout) => stdout,
            None => return Ok(false),
        };

        let mut buf = vec![0u8; len];
        match stdout.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => return Err(DomainError::Playback(format!("Decoder read failed: {}", e))),
        }

        let frame = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .ok_or_else(|| DomainError::Playback("Decoder produced a short frame".to_string()))?;
        self.frame = Some(frame);
        Ok(true)
    }
}

#[async_trait]
impl PlaybackPort for FfmpegPlaybackAdapter {
    /// The decoder has no audio output; audio is muxed from the file by the encoder
    fn set_volume(&mut self, volume: f32) {
        debug!(volume, "Playback volume ignored by the decoder");
    }

    async fn seek(&mut self, position: f64) -> Result<(), DomainError> {
        self.spawn_decoder(position)?;
        self.seek_base = position;
        self.position = position;
        self.frames_read = 0;
        self.frame = None;
        self.ended = false;
        self.paused = true;
        self.initial_pending = false;

        if self.read_frame().await? {
            self.initial_pending = true;
        } else {
            self.ended = true;
        }
        Ok(())
    }

    fn has_current_data(&self) -> bool {
        self.frame.is_some()
    }

    async fn wait_for_data(&mut self) -> Result<(), DomainError> {
        if self.frame.is_some() {
            return Ok(());
        }
        if self.read_frame().await? {
            self.initial_pending = true;
            Ok(())
        } else {
            Err(DomainError::Playback(format!(
                "No video data at {:.3}s (source is {:.3}s long)",
                self.position, self.info.duration
            )))
        }
    }

    fn capture_audio_track(&mut self) -> Result<Option<AudioTrack>, DomainError> {
        if !self.info.has_audio {
            return Ok(None);
        }
        Ok(Some(AudioTrack {
            label: "0:a:0".to_string(),
            source_path: Some(self.path.clone()),
            start_offset: self.position,
        }))
    }

    async fn play(&mut self) -> Result<(), DomainError> {
        if self.decoder.is_none() {
            return Err(DomainError::Playback("Source was never positioned".to_string()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
        self.stop_decoder();
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_signal(&self) -> FrameSignal {
        FrameSignal::Presented
    }

    async fn wait_presented_frame(&mut self) -> Result<(), DomainError> {
        if self.initial_pending {
            self.initial_pending = false;
            return Ok(());
        }
        if self.ended {
            return Ok(());
        }

        if self.read_frame().await? {
            self.frames_read += 1;
            self.position = self.seek_base + self.frames_read as f64 / self.frame_rate as f64;
        } else {
            self.ended = true;
        }
        Ok(())
    }

    fn current_frame(&self) -> Option<&RgbImage> {
        self.frame.as_ref()
    }
}

impl Drop for FfmpegPlaybackAdapter {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}
