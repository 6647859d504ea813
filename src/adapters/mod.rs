// Adapters - External system implementations

pub mod encoder_ffmpeg;
pub mod http_reqwest;
pub mod playback_ffmpeg;
pub mod probe_ffprobe;
pub mod sampler_rand;
pub mod toml_config;

// Re-export adapters
pub use encoder_ffmpeg::FfmpegEncoderAdapter;
pub use http_reqwest::ReqwestHttpAdapter;
pub use playback_ffmpeg::FfmpegPlaybackAdapter;
pub use probe_ffprobe::FfprobeAdapter;
pub use sampler_rand::{FixedOrderSampler, RandomSampler};
pub use toml_config::{AppConfig, TomlConfigAdapter};
