//! FFmpeg encoder sink
//!
//! Raw RGB frames are piped to an `ffmpeg` child on stdin; the muxed output
//! is streamed back on stdout and buffered as chunks.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

const H264_ENCODERS: [&str; 5] = [
    "libx264",
    "libopenh264",
    "h264_videotoolbox",
    "h264_nvenc",
    "h264_vaapi",
];
const VP9_ENCODERS: [&str; 1] = ["libvpx-vp9"];
const WEBM_DEFAULT_VIDEO: [&str; 2] = ["libvpx-vp9", "libvpx"];
const AAC_ENCODERS: [&str; 1] = ["aac"];
const OPUS_ENCODERS: [&str; 2] = ["libopus", "opus"];
const WEBM_DEFAULT_AUDIO: [&str; 3] = ["libopus", "opus", "libvorbis"];

const AUDIO_BITRATE: &str = "128k";
const READ_CHUNK: usize = 64 * 1024;

/// Encoder names picked for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderChoice {
    pub video: String,
    pub audio: String,
    pub muxer: &'static str,
}

struct Recording {
    child: Child,
    stdin: Option<ChildStdin>,
    output: JoinHandle<std::io::Result<Vec<Vec<u8>>>>,
    diagnostics: JoinHandle<String>,
}

pub struct FfmpegEncoderAdapter {
    binary: PathBuf,
    encoders: HashSet<String>,
    recording: Option<Recording>,
}

impl FfmpegEncoderAdapter {
    /// Locate `ffmpeg` and list the encoders it was built with
    pub async fn detect() -> Result<Self, DomainError> {
        let binary = which::which("ffmpeg").map_err(|_| {
            DomainError::PlatformUnsupported("ffmpeg was not found on PATH".to_string())
        })?;

        let output = Command::new(&binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(DomainError::Encoder("`ffmpeg -encoders` failed".to_string()));
        }

        let encoders = parse_encoder_list(&String::from_utf8_lossy(&output.stdout));
        debug!(count = encoders.len(), "Detected ffmpeg encoders");
        Ok(Self::with_encoders(binary, encoders))
    }

    pub fn with_encoders(binary: PathBuf, encoders: HashSet<String>) -> Self {
        Self {
            binary,
            encoders,
            recording: None,
        }
    }

    fn first_available(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find(|name| self.encoders.contains(**name))
            .map(|name| name.to_string())
    }

    /// Map a profile to concrete encoders, `None` when this build cannot record it
    pub fn choose(&self, profile: &EncoderProfile) -> Option<EncoderChoice> {
        let webm = profile.container == Container::WebM;
        let video = match (profile.video_codec, webm) {
            // the webm muxer only carries VP8/VP9/AV1
            (Some("h264"), true) => None,
            (Some("h264"), false) => self.first_available(&H264_ENCODERS),
            (Some("vp9"), true) => self.first_available(&VP9_ENCODERS),
            (Some(_), _) => None,
            (None, true) => self.first_available(&WEBM_DEFAULT_VIDEO),
            (None, false) => self
                .first_available(&H264_ENCODERS)
                .or_else(|| self.first_available(&["mpeg4"])),
        }?;
        let audio = match (profile.audio_codec, webm) {
            (Some("aac"), false) => self.first_available(&AAC_ENCODERS),
            (Some("opus"), true) => self.first_available(&OPUS_ENCODERS),
            (Some(_), _) => None,
            (None, true) => self.first_available(&WEBM_DEFAULT_AUDIO),
            (None, false) => self.first_available(&AAC_ENCODERS),
        }?;

        Some(EncoderChoice {
            video,
            audio,
            muxer: if webm { "webm" } else { "mp4" },
        })
    }

    fn build_args(config: &SinkConfig, choice: &EncoderChoice) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", config.width, config.height),
            "-r".into(),
            config.frame_rate.to_string(),
            "-i".into(),
            "pipe:0".into(),
        ];

        let audio_path = config.audio.as_ref().and_then(|a| a.source_path.as_ref());
        if let (Some(track), Some(path)) = (config.audio.as_ref(), audio_path) {
            args.extend([
                "-ss".into(),
                format!("{:.3}", track.start_offset),
                "-i".into(),
                path.to_string_lossy().into_owned(),
            ]);
        }

        args.extend(["-map".into(), "0:v:0".into()]);
        if audio_path.is_some() {
            args.extend([
                "-map".into(),
                "1:a:0".into(),
                "-c:a".into(),
                choice.audio.clone(),
                "-b:a".into(),
                AUDIO_BITRATE.into(),
                "-shortest".into(),
            ]);
        }

        args.extend([
            "-c:v".into(),
            choice.video.clone(),
            "-b:v".into(),
            config.video_bitrate.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]);
        if choice.muxer == "mp4" {
            args.extend(["-movflags".into(), "frag_keyframe+empty_moov".into()]);
        }
        args.extend(["-f".into(), choice.muxer.into(), "pipe:1".into()]);
        args
    }

    fn recording_mut(&mut self) -> Result<&mut Recording, DomainError> {
        self.recording
            .as_mut()
            .ok_or_else(|| DomainError::Encoder("Encoder was not started".to_string()))
    }
}

/// Encoder names from `ffmpeg -encoders` output
pub fn parse_encoder_list(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}

async fn read_chunks<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Vec<Vec<u8>>> {
    let mut chunks = Vec::new();
    loop {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(chunks);
        }
        buf.truncate(n);
        chunks.push(buf);
    }
}

#[async_trait]
impl EncoderPort for FfmpegEncoderAdapter {
    fn is_type_supported(&self, profile: &EncoderProfile) -> bool {
        self.choose(profile).is_some()
    }

    async fn start(&mut self, config: &SinkConfig) -> Result<(), DomainError> {
        if self.recording.is_some() {
            return Err(DomainError::Encoder("Encoder is already recording".to_string()));
        }
        let choice = self.choose(&config.profile).ok_or_else(|| {
            DomainError::PlatformUnsupported(format!(
                "ffmpeg cannot record {}",
                config.profile.mime_type
            ))
        })?;
        let args = Self::build_args(config, &choice);
        debug!(?args, "Starting ffmpeg encoder");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::Encoder(format!("Failed to start ffmpeg encoder: {}", e)))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::Encoder("Encoder stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        let output = tokio::spawn(read_chunks(stdout));
        let diagnostics = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        self.recording = Some(Recording {
            child,
            stdin,
            output,
            diagnostics,
        });
        Ok(())
    }

    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), DomainError> {
        let recording = self.recording_mut()?;
        let stdin = recording
            .stdin
            .as_mut()
            .ok_or_else(|| DomainError::Encoder("Encoder input already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| DomainError::Encoder(format!("Writing frame to ffmpeg failed: {}", e)))
    }

    async fn stop(&mut self) -> Result<Vec<Vec<u8>>, DomainError> {
        let mut recording = self
            .recording
            .take()
            .ok_or_else(|| DomainError::Encoder("Encoder was not started".to_string()))?;

        if let Some(mut stdin) = recording.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        let status = recording.child.wait().await?;
        let chunks = recording
            .output
            .await
            .map_err(|e| DomainError::Encoder(format!("Encoder output task failed: {}", e)))??;
        let diagnostics = recording.diagnostics.await.unwrap_or_default();

        if !status.success() {
            return Err(DomainError::Encoder(format!(
                "ffmpeg exited with {}: {}",
                status,
                diagnostics.trim()
            )));
        }
        if !diagnostics.trim().is_empty() {
            warn!(stderr = %diagnostics.trim(), "ffmpeg reported problems");
        }
        Ok(chunks)
    }

    async fn abort(&mut self) {
        if let Some(mut recording) = self.recording.take() {
            recording.stdin = None;
            let _ = recording.child.kill().await;
            recording.output.abort();
            recording.diagnostics.abort();
        }
    }
}
