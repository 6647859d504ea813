//! reelx CLI
//!
//! Fetch remote videos through provider and proxy fallbacks and export
//! vertical clips with ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! reelx resolve "https://youtu.be/ABCDEFGHIJK"
//! reelx fetch "https://www.youtube.com/watch?v=ABCDEFGHIJK" -o downloads
//! reelx export --input talk.mp4 --start 00:00:10 --end 00:00:40 --aspect 9:16
//! reelx export --input talk.mp4 --analysis analysis.json --clip 3 --format webm
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use reelx_cli::cli::{commands, Cli};
use reelx_cli::config_initialization::initialize_configuration_hierarchy;
use reelx_cli::utils::logging::{LogFormat, LogLevel, LoggingConfig, LoggingSystem};

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = initialize_configuration_hierarchy(&cli)?;

    let logging = LoggingConfig {
        level: loaded
            .config
            .logging
            .level
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)?,
        format: loaded
            .config
            .logging
            .format
            .parse::<LogFormat>()
            .map_err(anyhow::Error::msg)?,
        ..LoggingConfig::default()
    };
    let logging = LoggingSystem::new(logging);
    logging
        .initialize()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    logging.log_system_info();

    match &loaded.source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => debug!("No configuration file found, using defaults"),
    }
    if !loaded.env_overrides.is_empty() {
        debug!(keys = ?loaded.env_overrides, "Applied environment overrides");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(commands::run(cli.command, &loaded.config))
}
