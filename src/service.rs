//! Trending service
//!
//! Request boundary: validates the target name, consults the cache, invokes
//! the orchestrator on a miss and wraps every outcome in an `Envelope`.
//! Nothing escapes as a panic or a raw error.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::Config;
use crate::error::FetchFailure;
use crate::http_client::{HttpClient, HttpClientConfig};
use crate::metrics;
use crate::orchestrator::FetchOrchestrator;
use crate::registry::SourceRegistry;
use crate::schemas::{Envelope, Item};
use crate::sources::FetchParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Cached,
    Forced,
}

pub struct TrendingService {
    orchestrator: Arc<FetchOrchestrator>,
    cache: Arc<ResponseCache>,
}

impl TrendingService {
    pub fn new(orchestrator: Arc<FetchOrchestrator>, cache: Arc<ResponseCache>) -> Self {
        Self { orchestrator, cache }
    }

    /// Wires the production registry, HTTP client and cache
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Arc::new(HttpClient::new(HttpClientConfig::from_config(config))?);
        let registry = Arc::new(SourceRegistry::from_config(config, client));
        let cache = Arc::new(ResponseCache::new(config.cache_ttl()));

        Ok(Self::new(Arc::new(FetchOrchestrator::new(registry)), cache))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn supported_names(&self) -> Vec<String> {
        self.orchestrator.supported_names()
    }

    /// Serves `name` from the cache when fresh, otherwise fetches it
    pub async fn handle(&self, name: Option<&str>, params: &FetchParams) -> Envelope {
        self.respond(name, params, Mode::Cached).await
    }

    /// Fetches `name` regardless of freshness. A failure leaves the cached
    /// entry as it was.
    pub async fn refresh(&self, name: Option<&str>, params: &FetchParams) -> Envelope {
        self.respond(name, params, Mode::Forced).await
    }

    #[instrument(skip(self, params), fields(source = name.unwrap_or_default()))]
    async fn respond(&self, name: Option<&str>, params: &FetchParams, mode: Mode) -> Envelope {
        let outcome = AssertUnwindSafe(self.resolve(name, params, mode))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Request handler panicked");
                Err(FetchFailure::Unexpected(message))
            });

        match &outcome {
            Ok(_) => metrics::record_request(metrics::OUTCOME_SUCCESS),
            Err(failure) => {
                metrics::record_request(failure.kind());
                if failure.is_caller_error() {
                    debug!(kind = failure.kind(), msg = %failure, "Rejected request");
                } else {
                    warn!(kind = failure.kind(), msg = %failure, "Request failed");
                }
            }
        }

        outcome.map(Arc::unwrap_or_clone).into()
    }

    async fn resolve(
        &self,
        name: Option<&str>,
        params: &FetchParams,
        mode: Mode,
    ) -> Result<Arc<Vec<Item>>, FetchFailure> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(FetchFailure::MissingSource {
                    supported: self.orchestrator.supported_names(),
                })
            }
        };

        if !self.orchestrator.supports(name) {
            return Err(FetchFailure::UnsupportedSource {
                name: name.to_string(),
                supported: self.orchestrator.supported_names(),
            });
        }

        let key = CacheKey::from_request(name, params);
        let fetch = || self.orchestrator.execute(name, params);

        match mode {
            Mode::Cached => {
                let (items, status) = self.cache.get_or_fetch(&key, fetch).await?;
                debug!(cache = status.as_str(), items = items.len(), "Resolved");
                Ok(items)
            }
            Mode::Forced => self.cache.refresh(&key, fetch).await,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
