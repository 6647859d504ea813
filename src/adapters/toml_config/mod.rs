// TOML config adapter - Typed application configuration loaded from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acquire::AcquisitionLimits;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::network::proxy::{ProxyChain, ProxyTransform};
use crate::network::DEFAULT_USER_AGENT;
use crate::resolver::cobalt::COBALT_INSTANCES;
use crate::resolver::invidious::INVIDIOUS_INSTANCES;
use crate::resolver::piped::PIPED_INSTANCES;

const MIB: u64 = 1024 * 1024;

/// Files tried, in order, when no `--config` is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["reelx.toml", "config/reelx.toml"];

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub resolver: ResolverConfig,
    pub providers: ProvidersConfig,
    pub acquisition: AcquisitionConfig,
    pub export: ExportConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-strategy timeout for metadata requests
    pub attempt_timeout_secs: u64,
    pub user_agent: String,
    /// Proxies tried for GET, in order
    pub read_only_proxies: Vec<String>,
    /// Proxies tried for POST, in order; each must forward bodies
    pub body_proxies: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            read_only_proxies: names(&["codetabs", "allorigins", "corsproxy", "thingproxy"]),
            body_proxies: names(&["corsproxy", "thingproxy", "codetabs"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Instances drawn per provider
    pub sample_size: usize,
    /// Provider priority
    pub provider_order: Vec<String>,
    /// Fixed sampling seed, for reproducible instance order
    pub seed: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            provider_order: names(&["piped", "invidious", "cobalt"]),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub piped: Vec<String>,
    pub invidious: Vec<String>,
    pub cobalt: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            piped: names(&PIPED_INSTANCES),
            invidious: names(&INVIDIOUS_INSTANCES),
            cobalt: names(&COBALT_INSTANCES),
        }
    }
}

impl ProvidersConfig {
    pub fn pool(&self, provider: &str) -> Option<&[String]> {
        match provider {
            "piped" => Some(&self.piped),
            "invidious" => Some(&self.invidious),
            "cobalt" => Some(&self.cobalt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub remote_ceiling_mb: u64,
    pub local_ceiling_mb: u64,
    /// Per-strategy timeout for binary downloads
    pub download_timeout_secs: u64,
    /// Read-only proxy order for downloads
    pub proxies: Vec<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            remote_ceiling_mb: 750,
            local_ceiling_mb: 5 * 1024,
            download_timeout_secs: 300,
            proxies: names(&["codetabs", "corsproxy", "thingproxy", "allorigins"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub seek_timeout_secs: u64,
    pub format: String,
    pub quality: String,
    pub aspect: String,
    pub frame_rate: u32,
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            seek_timeout_secs: 10,
            format: "mp4".to_string(),
            quality: "720p".to_string(),
            aspect: "9:16".to_string(),
            frame_rate: 30,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.resolver.sample_size == 0 {
            return Err(DomainError::Config(
                "resolver.sample_size must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("network.attempt_timeout_secs", self.network.attempt_timeout_secs),
            ("acquisition.download_timeout_secs", self.acquisition.download_timeout_secs),
            ("export.seek_timeout_secs", self.export.seek_timeout_secs),
        ] {
            if value == 0 {
                return Err(DomainError::Config(format!("{} must be greater than 0", key)));
            }
        }
        if self.export.frame_rate == 0 {
            return Err(DomainError::Config(
                "export.frame_rate must be greater than 0".to_string(),
            ));
        }
        for provider in &self.resolver.provider_order {
            if self.providers.pool(provider).is_none() {
                return Err(DomainError::Config(format!(
                    "Unknown provider '{}'. Valid providers: piped, invidious, cobalt",
                    provider
                )));
            }
        }

        self.proxy_chain()?;
        self.download_chain()?;
        self.export_settings()?;
        Ok(())
    }

    pub fn proxy_chain(&self) -> Result<ProxyChain, DomainError> {
        ProxyChain::from_names(&self.network.read_only_proxies, &self.network.body_proxies)
    }

    /// Metadata chain with the download read-only order swapped in
    pub fn download_chain(&self) -> Result<ProxyChain, DomainError> {
        let read_only = self
            .acquisition
            .proxies
            .iter()
            .map(|n| ProxyTransform::parse(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.proxy_chain()?.with_read_only(read_only))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.network.attempt_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.acquisition.download_timeout_secs)
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_secs(self.export.seek_timeout_secs)
    }

    pub fn limits(&self) -> AcquisitionLimits {
        AcquisitionLimits {
            remote_ceiling: self.acquisition.remote_ceiling_mb * MIB,
            local_ceiling: self.acquisition.local_ceiling_mb * MIB,
        }
    }

    pub fn export_settings(&self) -> Result<ExportSettings, DomainError> {
        Ok(ExportSettings {
            aspect: AspectRatio::parse(&self.export.aspect)?,
            quality: QualityTier::parse(&self.export.quality)?,
            format: OutputFormat::parse(&self.export.format)?,
            frame_rate: self.export.frame_rate,
        })
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn parse(content: &str) -> Result<AppConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<AppConfig, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Explicit path if given (it must exist), else the first default path present
    pub fn discover(explicit: Option<&Path>) -> Result<Option<PathBuf>, DomainError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(DomainError::Config(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let found = DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file());
        debug!(path = ?found, "Config discovery");
        Ok(found)
    }

    pub fn serialize(config: &AppConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::Config(format!("Failed to serialize config: {}", e)))
    }
}
