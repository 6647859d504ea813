//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Video link (YouTube watch, short, embed or youtu.be URL)
    pub locator: String,

    /// Print the stream descriptor as JSON
    #[arg(long)]
    pub json: bool,

    /// Instances sampled per provider
    #[arg(long)]
    pub sample_size: Option<usize>,
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Video link or direct media URL
    pub locator: String,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the written file as JSON
    #[arg(long)]
    pub json: bool,

    /// Instances sampled per provider
    #[arg(long)]
    pub sample_size: Option<usize>,
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long, requires = "end", conflicts_with = "analysis")]
    pub start: Option<String>,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long, requires = "start")]
    pub end: Option<String>,

    /// Analysis document providing the clip catalog
    #[arg(long, requires = "clip")]
    pub analysis: Option<PathBuf>,

    /// Clip number to take from the analysis catalog (also names the output)
    #[arg(long)]
    pub clip: Option<u32>,

    /// Title used in the output filename when exporting by time range
    #[arg(long)]
    pub title: Option<String>,

    /// Output container format (mp4, webm)
    #[arg(long)]
    pub format: Option<String>,

    /// Output quality tier (720p, 1080p)
    #[arg(long)]
    pub quality: Option<String>,

    /// Output aspect ratio, W:H
    #[arg(long)]
    pub aspect: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit progress as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}
