//! Configuration initialization and hierarchy management

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::adapters::{AppConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};

/// Resolved configuration and the file it came from, if any
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
    /// `REELX_*` variables that were applied
    pub env_overrides: Vec<&'static str>,
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<LoadedConfig> {
    let source = TomlConfigAdapter::discover(cli.config.as_deref())?;
    let mut config = match &source {
        Some(path) => TomlConfigAdapter::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };

    let env_overrides = apply_environment_overrides(&mut config, |key| std::env::var(key).ok())?;
    apply_cli_overrides(&mut config, cli);

    config.validate().context("Invalid configuration")?;
    Ok(LoadedConfig {
        config,
        source,
        env_overrides,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply `REELX_*` variables read through `lookup`; returns the keys applied
pub fn apply_environment_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<Vec<&'static str>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();
    let mut take = |key: &'static str| -> Option<String> {
        let value = lookup(key)?;
        applied.push(key);
        Some(value)
    };

    if let Some(v) = take("REELX_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = take("REELX_LOG_FORMAT") {
        config.logging.format = v;
    }
    if let Some(v) = take("REELX_USER_AGENT") {
        config.network.user_agent = v;
    }
    if let Some(v) = take("REELX_ATTEMPT_TIMEOUT_SECS") {
        config.network.attempt_timeout_secs = parse_value("REELX_ATTEMPT_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = take("REELX_PROXIES") {
        config.network.read_only_proxies = parse_list(&v);
    }
    if let Some(v) = take("REELX_BODY_PROXIES") {
        config.network.body_proxies = parse_list(&v);
    }
    if let Some(v) = take("REELX_SAMPLE_SIZE") {
        config.resolver.sample_size = parse_value("REELX_SAMPLE_SIZE", &v)?;
    }
    if let Some(v) = take("REELX_PROVIDERS") {
        config.resolver.provider_order = parse_list(&v);
    }
    if let Some(v) = take("REELX_SEED") {
        config.resolver.seed = Some(parse_value("REELX_SEED", &v)?);
    }
    if let Some(v) = take("REELX_REMOTE_CEILING_MB") {
        config.acquisition.remote_ceiling_mb = parse_value("REELX_REMOTE_CEILING_MB", &v)?;
    }
    if let Some(v) = take("REELX_LOCAL_CEILING_MB") {
        config.acquisition.local_ceiling_mb = parse_value("REELX_LOCAL_CEILING_MB", &v)?;
    }
    if let Some(v) = take("REELX_DOWNLOAD_TIMEOUT_SECS") {
        config.acquisition.download_timeout_secs = parse_value("REELX_DOWNLOAD_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = take("REELX_DOWNLOAD_PROXIES") {
        config.acquisition.proxies = parse_list(&v);
    }
    if let Some(v) = take("REELX_SEEK_TIMEOUT_SECS") {
        config.export.seek_timeout_secs = parse_value("REELX_SEEK_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = take("REELX_FORMAT") {
        config.export.format = v;
    }
    if let Some(v) = take("REELX_QUALITY") {
        config.export.quality = v;
    }
    if let Some(v) = take("REELX_ASPECT") {
        config.export.aspect = v;
    }
    if let Some(v) = take("REELX_FRAME_RATE") {
        config.export.frame_rate = parse_value("REELX_FRAME_RATE", &v)?;
    }
    if let Some(v) = take("REELX_OUTPUT_DIR") {
        config.export.output_dir = PathBuf::from(v);
    }

    Ok(applied)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    match &cli.command {
        Commands::Resolve(args) => {
            if let Some(n) = args.sample_size {
                config.resolver.sample_size = n;
            }
        }
        Commands::Fetch(args) => {
            if let Some(n) = args.sample_size {
                config.resolver.sample_size = n;
            }
            if let Some(dir) = &args.output {
                config.export.output_dir = dir.clone();
            }
        }
        Commands::Export(args) => {
            if let Some(format) = &args.format {
                config.export.format = format.clone();
            }
            if let Some(quality) = &args.quality {
                config.export.quality = quality.clone();
            }
            if let Some(aspect) = &args.aspect {
                config.export.aspect = aspect.clone();
            }
            if let Some(dir) = &args.output {
                config.export.output_dir = dir.clone();
            }
        }
    }
}
