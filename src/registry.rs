//! Source registry
//!
//! Fixed, ordered mapping from target name to adapter. Built once at startup
//! and shared read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::http_client::HttpClient;
use crate::sources::tophub::{self, Board};
use crate::sources::{echojs, maoyan, xinquji, DevToSource, HackerNewsSource, Source, YuqueSource};

#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source under its own id. A later source with the same id
    /// replaces the earlier one and keeps its position.
    pub fn register(mut self, source: Arc<dyn Source>) -> Self {
        let id = source.id().to_string();
        match self.index.get(&id) {
            Some(&pos) => self.sources[pos] = source,
            None => {
                self.index.insert(id, self.sources.len());
                self.sources.push(source);
            }
        }
        self
    }

    /// Builds the production source set.
    ///
    /// Every source gets its own permit pool on the shared connection pool.
    /// Paged sources get at least `max_page_range` permits so a full fan-out
    /// goes out in one round.
    pub fn from_config(config: &Config, client: Arc<HttpClient>) -> Self {
        let single = config.max_concurrent_requests;
        let paged = single.max(config.max_page_range as usize);
        let scoped = |permits: usize| Arc::new(client.scoped(permits));

        let board = |b: Board| -> Arc<dyn Source> {
            Arc::new(tophub::board_source(b, &config.tophub_base_url, scoped(single)))
        };

        let registry = Self::new()
            .register(board(tophub::WEIBO))
            .register(board(tophub::WEIXIN))
            .register(board(tophub::KAIYAN))
            .register(board(tophub::ZHIHU))
            .register(board(tophub::ZUIMEI))
            .register(Arc::new(echojs::source(&config.echojs_base_url, scoped(single))))
            .register(Arc::new(YuqueSource::new(
                scoped(single),
                &config.yuque_base_url,
                config.yuque_limit,
            )))
            .register(Arc::new(maoyan::source(&config.maoyan_base_url, scoped(single))))
            .register(board(tophub::KR36))
            .register(board(tophub::SSPAI))
            .register(Arc::new(xinquji::source(&config.xinquji_base_url, scoped(single))))
            .register(Arc::new(HackerNewsSource::new(
                scoped(paged),
                &config.hackernews_base_url,
                config.default_page_range,
                config.max_page_range,
            )))
            .register(Arc::new(DevToSource::new(
                scoped(paged),
                &config.devto_base_url,
                config.default_page_range,
                config.max_page_range,
            )));

        info!(
            sources = registry.len(),
            permits_per_source = single,
            permits_per_paged_source = paged,
            "Source registry initialized"
        );
        registry
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.index.get(name).map(|&pos| self.sources[pos].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names in registration order
    pub fn supported_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
