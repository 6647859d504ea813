//! CLI module for reelx
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// reelx: fetch remote videos and export vertical clips
///
/// Resolves video-sharing links through public stream providers, downloads the
/// payload through a proxy fallback chain, and re-encodes time ranges into
/// cropped clips with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "reelx")]
#[command(about = "reelx - Remote video acquisition and vertical clip export")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file (default: reelx.toml, then config/reelx.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a video link to a downloadable stream
    Resolve(args::ResolveArgs),
    /// Download a remote video into a local file
    Fetch(args::FetchArgs),
    /// Export a vertical clip from a local video file
    Export(args::ExportArgs),
}
