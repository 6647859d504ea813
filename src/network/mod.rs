//! Network access layer: direct request first, then proxies in fixed order

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::{HttpPort, HttpRequest, HttpResponse};

pub mod proxy;

pub use proxy::{ProxyChain, ProxyTransform};

/// Default bound on a single strategy attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

pub const DEFAULT_USER_AGENT: &str = concat!("reelx/", env!("CARGO_PKG_VERSION"));

/// How a request ended up being served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Proxy(ProxyTransform),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Proxy(transform) => write!(f, "{}", transform),
        }
    }
}

/// First successful response and the strategy that produced it
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: HttpResponse,
    pub strategy: Strategy,
}

/// Sequential direct-then-proxy fetcher.
///
/// Each strategy runs once under its own timeout. Failures and non-success
/// statuses are logged at debug and the next strategy is tried.
#[derive(Clone)]
pub struct FallbackFetcher {
    http: Arc<dyn HttpPort>,
    chain: ProxyChain,
    attempt_timeout: Duration,
    user_agent: String,
}

impl FallbackFetcher {
    pub fn new(http: Arc<dyn HttpPort>, chain: ProxyChain, attempt_timeout: Duration) -> Self {
        Self {
            http,
            chain,
            attempt_timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Same transport and settings, different proxy chain
    pub fn with_chain(&self, chain: ProxyChain) -> Self {
        Self {
            chain,
            ..self.clone()
        }
    }

    pub fn chain(&self) -> &ProxyChain {
        &self.chain
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Fetch with the default per-attempt timeout
    pub async fn fetch_with_fallback(&self, request: &HttpRequest) -> DomainResult<FetchOutcome> {
        self.fetch_with_timeout(request, self.attempt_timeout).await
    }

    /// Fetch with an explicit per-attempt timeout
    pub async fn fetch_with_timeout(
        &self,
        request: &HttpRequest,
        attempt_timeout: Duration,
    ) -> DomainResult<FetchOutcome> {
        let base = request.clone().with_header("User-Agent", self.user_agent.clone());

        let strategies = std::iter::once(Strategy::Direct).chain(
            self.chain
                .for_method(request.method)
                .iter()
                .map(|transform| Strategy::Proxy(*transform)),
        );

        let mut tried = 0usize;
        let mut last_failure = String::from("no strategy attempted");

        for strategy in strategies {
            tried += 1;
            let attempt = match strategy {
                Strategy::Direct => base.clone(),
                Strategy::Proxy(transform) => base.retarget(transform.rewrite(&request.url)),
            };

            match tokio::time::timeout(attempt_timeout, self.http.send(&attempt)).await {
                Ok(Ok(response)) if response.is_success() => {
                    info!(url = %request.url, strategy = %strategy, "Fetch succeeded");
                    return Ok(FetchOutcome { response, strategy });
                }
                Ok(Ok(response)) => {
                    debug!(url = %request.url, strategy = %strategy, status = response.status, "Non-success status");
                    last_failure = format!("{} returned HTTP {}", strategy, response.status);
                }
                Ok(Err(e)) => {
                    debug!(url = %request.url, strategy = %strategy, error = %e, "Request failed");
                    last_failure = format!("{}: {}", strategy, e);
                }
                Err(_) => {
                    debug!(url = %request.url, strategy = %strategy, timeout = ?attempt_timeout, "Request timed out");
                    last_failure = format!("{} timed out after {:?}", strategy, attempt_timeout);
                }
            }
        }

        Err(DomainError::Network(format!(
            "Connection failed via all proxies ({} strategies tried, last: {})",
            tried, last_failure
        )))
    }
}
