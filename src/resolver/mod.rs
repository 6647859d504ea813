//! Provider resolver: providers in priority order, sampled instances in turn

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::network::FallbackFetcher;
use crate::ports::InstanceSampler;

pub mod cobalt;
pub mod invidious;
pub mod piped;

pub use cobalt::CobaltProvider;
pub use invidious::InvidiousProvider;
pub use piped::PipedProvider;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Quality labels from best to worst
pub const QUALITY_LADDER: [&str; 4] = ["1080p", "720p", "480p", "360p"];

/// Position on the quality ladder, unknown labels last
pub fn quality_rank(label: Option<&str>) -> usize {
    label
        .and_then(|l| QUALITY_LADDER.iter().position(|q| *q == l))
        .unwrap_or(QUALITY_LADDER.len())
}

/// What the providers are asked to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTarget {
    pub video_id: String,
    pub canonical_url: String,
}

impl ResolveTarget {
    pub fn from_locator(locator: &Locator) -> DomainResult<Self> {
        let video_id = locator.video_id.clone().ok_or_else(|| {
            DomainError::Locator(format!("Could not extract video ID from '{}'", locator.raw))
        })?;
        Ok(Self {
            video_id,
            canonical_url: locator.canonical.clone(),
        })
    }
}

/// A stream provider backed by a pool of interchangeable instances
#[async_trait]
pub trait StreamProvider: Send + Sync {
    fn name(&self) -> &str;

    fn instances(&self) -> &[String];

    /// Query one instance. `Ok(None)` means the response parsed but carried no usable stream.
    async fn query(
        &self,
        fetcher: &FallbackFetcher,
        instance: &str,
        target: &ResolveTarget,
    ) -> DomainResult<Option<StreamDescriptor>>;
}

/// Drop repeated instances, keeping first occurrences in order
pub fn dedupe_pool(pool: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|instance| seen.insert(instance.as_str()))
        .cloned()
        .collect()
}

pub struct ProviderResolver {
    fetcher: FallbackFetcher,
    providers: Vec<Box<dyn StreamProvider>>,
    sampler: Arc<dyn InstanceSampler>,
    sample_size: usize,
}

impl ProviderResolver {
    pub fn new(
        fetcher: FallbackFetcher,
        providers: Vec<Box<dyn StreamProvider>>,
        sampler: Arc<dyn InstanceSampler>,
        sample_size: usize,
    ) -> Self {
        Self {
            fetcher,
            providers,
            sampler,
            sample_size,
        }
    }

    /// Piped, Invidious and Cobalt with their default pools
    pub fn with_default_providers(fetcher: FallbackFetcher, sampler: Arc<dyn InstanceSampler>) -> Self {
        let providers: Vec<Box<dyn StreamProvider>> = vec![
            Box::new(PipedProvider::default()),
            Box::new(InvidiousProvider::default()),
            Box::new(CobaltProvider::default()),
        ];
        Self::new(fetcher, providers, sampler, DEFAULT_SAMPLE_SIZE)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve a target to the first usable stream descriptor
    pub async fn resolve(&self, target: &ResolveTarget) -> DomainResult<StreamDescriptor> {
        let mut attempts: Vec<ResolutionAttempt> = Vec::new();

        for provider in &self.providers {
            let pool = dedupe_pool(provider.instances());
            let sample = self.sampler.sample(&pool, self.sample_size);
            debug!(
                provider = provider.name(),
                pool = pool.len(),
                sampled = sample.len(),
                "Trying provider"
            );

            for instance in sample {
                let reason = match provider.query(&self.fetcher, &instance, target).await {
                    Ok(Some(descriptor)) => {
                        info!(
                            provider = provider.name(),
                            instance = %instance,
                            muxed = descriptor.muxed,
                            "Resolved stream"
                        );
                        return Ok(descriptor);
                    }
                    Ok(None) => "no usable stream".to_string(),
                    Err(e) => e.to_string(),
                };
                debug!(provider = provider.name(), instance = %instance, reason = %reason, "Instance failed");
                attempts.push(ResolutionAttempt {
                    provider: provider.name().to_string(),
                    instance,
                    reason,
                });
            }
        }

        warn!(attempts = attempts.len(), "All resolution strategies failed");
        for attempt in &attempts {
            warn!("  {}", attempt);
        }
        Err(DomainError::ResolutionExhausted { attempts })
    }
}
