//! Configuration for the aggregator service

use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP shell
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    // Response cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ms: u64,

    // Upstream HTTP
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // Paged sources
    #[serde(default = "default_page_range")]
    pub default_page_range: u32,
    #[serde(default = "default_max_page_range")]
    pub max_page_range: u32,

    #[serde(default = "default_yuque_limit")]
    pub yuque_limit: u32,

    // Upstream base URLs
    #[serde(default = "default_tophub_base")]
    pub tophub_base_url: String,
    #[serde(default = "default_echojs_base")]
    pub echojs_base_url: String,
    #[serde(default = "default_yuque_base")]
    pub yuque_base_url: String,
    #[serde(default = "default_maoyan_base")]
    pub maoyan_base_url: String,
    #[serde(default = "default_xinquji_base")]
    pub xinquji_base_url: String,
    #[serde(default = "default_hackernews_base")]
    pub hackernews_base_url: String,
    #[serde(default = "default_devto_base")]
    pub devto_base_url: String,

    // Metrics endpoint
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    3000
}

fn default_cache_ttl() -> u64 {
    3_600_000 // 1 hour
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; trending-hub/{})",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_page_range() -> u32 {
    7
}

fn default_max_page_range() -> u32 {
    20
}

fn default_yuque_limit() -> u32 {
    20
}

fn default_tophub_base() -> String {
    "https://tophub.today".to_string()
}

fn default_echojs_base() -> String {
    "https://www.echojs.com".to_string()
}

fn default_yuque_base() -> String {
    "https://www.yuque.com".to_string()
}

fn default_maoyan_base() -> String {
    "https://piaofang.maoyan.com".to_string()
}

fn default_xinquji_base() -> String {
    "https://xinquji.com".to_string()
}

fn default_hackernews_base() -> String {
    "https://hn.algolia.com".to_string()
}

fn default_devto_base() -> String {
    "https://dev.to".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            cache_ttl_ms: default_cache_ttl(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            default_page_range: default_page_range(),
            max_page_range: default_max_page_range(),
            yuque_limit: default_yuque_limit(),
            tophub_base_url: default_tophub_base(),
            echojs_base_url: default_echojs_base(),
            yuque_base_url: default_yuque_base(),
            maoyan_base_url: default_maoyan_base(),
            xinquji_base_url: default_xinquji_base(),
            hackernews_base_url: default_hackernews_base(),
            devto_base_url: default_devto_base(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Points every upstream at one base URL (mock servers, staging mirrors)
    pub fn with_upstream_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        self.tophub_base_url = base.clone();
        self.echojs_base_url = base.clone();
        self.yuque_base_url = base.clone();
        self.maoyan_base_url = base.clone();
        self.xinquji_base_url = base.clone();
        self.hackernews_base_url = base.clone();
        self.devto_base_url = base;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_ms == 0 {
            bail!("CACHE_TTL_MS must be greater than zero");
        }
        if self.max_concurrent_requests == 0 {
            bail!("MAX_CONCURRENT_REQUESTS must be greater than zero");
        }
        if self.default_page_range == 0 || self.default_page_range > self.max_page_range {
            bail!(
                "DEFAULT_PAGE_RANGE must be within 1..={} (got {})",
                self.max_page_range,
                self.default_page_range
            );
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.cache_ttl_ms, 3_600_000);
        assert_eq!(config.default_page_range, 7);
        assert_eq!(config.tophub_base_url, "https://tophub.today");
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_upstream_base() {
        let config = Config::default().with_upstream_base("http://127.0.0.1:4000/");
        assert_eq!(config.tophub_base_url, "http://127.0.0.1:4000");
        assert_eq!(config.devto_base_url, "http://127.0.0.1:4000");
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = Config {
            default_page_range: 30,
            max_page_range: 20,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            cache_ttl_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
