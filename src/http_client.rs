//! HTTP Client Module
//!
//! Shared upstream transport for every adapter:
//! - Semaphore-based limit on concurrent upstream requests, one pool per
//!   source so a slow upstream cannot starve the others
//! - Non-2xx responses surface as errors
//! - No retries; a failed call is reported once

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SourceError};
use crate::metrics;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum concurrent upstream requests per permit pool
    pub max_concurrent_requests: usize,
    /// Whole-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            request_timeout: None,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("trending-hub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests,
            request_timeout: config.request_timeout(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Upstream HTTP client with concurrency limiting
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,
    /// Concurrency semaphore for this client's requests
    semaphore: Arc<Semaphore>,
}

impl HttpClient {
    /// Creates a new HTTP client
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true);

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests));

        Ok(Self { client, semaphore })
    }

    /// Creates a client with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Client sharing this one's connection pool but with its own
    /// `max_concurrent_requests` permits
    pub fn scoped(&self, max_concurrent_requests: usize) -> Self {
        Self {
            client: self.client.clone(),
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests)),
        }
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// The permit is held until the body is fully read so the limit covers
    /// the whole transfer, not only the headers.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::ConnectionLost("Semaphore closed".to_string()))?;

        debug!(url = %url, "Executing upstream GET");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream_request("error");
                warn!(url = %url, error = %e, "Upstream request failed");
                return Err(SourceError::HttpError(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            metrics::record_upstream_request(status.as_str());
            warn!(url = %url, status = %status, "Upstream returned non-success status");
            return Err(SourceError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        metrics::record_upstream_request(status.as_str());
        let body = response.text().await?;

        debug!(url = %url, bytes = body.len(), "Upstream GET completed");
        Ok(body)
    }

    /// Fetches `url` and decodes the body as JSON into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Gets the number of available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
