use std::sync::Arc;

use crate::acquire::BinaryAcquirer;
use crate::adapters::{AppConfig, RandomSampler, ReqwestHttpAdapter};
use crate::app::{export_interactor::ExportInteractor, import_interactor::ImportInteractor};
use crate::domain::errors::DomainError;
use crate::engine::{ClipExporter, ExportSlot, ProgressCallback};
use crate::network::FallbackFetcher;
use crate::ports::{AnalysisPort, HttpPort, InstanceSampler};
use crate::resolver::cobalt::CobaltProvider;
use crate::resolver::invidious::InvidiousProvider;
use crate::resolver::piped::PipedProvider;
use crate::resolver::{ProviderResolver, StreamProvider};

pub trait AppContainer: Send + Sync {
    fn import_interactor(&self) -> Arc<ImportInteractor>;
    fn export_interactor(&self) -> Arc<ExportInteractor>;
}

pub struct DefaultAppContainer {
    import_interactor: Arc<ImportInteractor>,
    export_interactor: Arc<ExportInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters from a validated configuration
    pub fn from_config(
        config: &AppConfig,
        callbacks: Vec<Arc<dyn ProgressCallback>>,
    ) -> Result<Self, DomainError> {
        let http = Arc::new(ReqwestHttpAdapter::new()?);
        let sampler: Arc<dyn InstanceSampler> = match config.resolver.seed {
            Some(seed) => Arc::new(RandomSampler::seeded(seed)),
            None => Arc::new(RandomSampler::new()),
        };
        Self::with_ports(
            config,
            http as Arc<dyn HttpPort>,
            sampler,
            None,
            callbacks,
        )
    }

    /// Wire with injected ports
    pub fn with_ports(
        config: &AppConfig,
        http: Arc<dyn HttpPort>,
        sampler: Arc<dyn InstanceSampler>,
        analysis: Option<Arc<dyn AnalysisPort>>,
        callbacks: Vec<Arc<dyn ProgressCallback>>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let fetcher = FallbackFetcher::new(http, config.proxy_chain()?, config.attempt_timeout())
            .with_user_agent(config.network.user_agent.clone());

        let providers = build_providers(config);
        let resolver = Arc::new(ProviderResolver::new(
            fetcher.clone(),
            providers,
            sampler,
            config.resolver.sample_size,
        ));
        let acquirer = Arc::new(BinaryAcquirer::new(
            fetcher.with_chain(config.download_chain()?),
            config.limits(),
            config.download_timeout(),
        ));
        let import_interactor = Arc::new(ImportInteractor::new(resolver, acquirer, analysis));

        let mut exporter = ClipExporter::new(ExportSlot::new(), config.seek_timeout());
        for callback in callbacks {
            exporter.add_callback(callback);
        }
        let export_interactor = Arc::new(ExportInteractor::new(Arc::new(exporter)));

        Ok(Self {
            import_interactor,
            export_interactor,
        })
    }
}

/// Providers in configured priority order, each with its configured pool
fn build_providers(config: &AppConfig) -> Vec<Box<dyn StreamProvider>> {
    config
        .resolver
        .provider_order
        .iter()
        .filter_map(|name| {
            let pool = config.providers.pool(name)?.to_vec();
            let provider: Box<dyn StreamProvider> = match name.as_str() {
                "piped" => Box::new(PipedProvider::new(pool)),
                "invidious" => Box::new(InvidiousProvider::new(pool)),
                "cobalt" => Box::new(CobaltProvider::new(pool)),
                _ => return None,
            };
            Some(provider)
        })
        .collect()
}

impl AppContainer for DefaultAppContainer {
    fn import_interactor(&self) -> Arc<ImportInteractor> {
        Arc::clone(&self.import_interactor)
    }

    fn export_interactor(&self) -> Arc<ExportInteractor> {
        Arc::clone(&self.export_interactor)
    }
}
